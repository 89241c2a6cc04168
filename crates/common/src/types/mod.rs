use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

impl Health {
    pub fn ok() -> Self {
        Self { status: "ok" }
    }
}

/// Landing payload served on `/status` (and `/` when no dashboard is configured).
#[derive(Serialize, Debug)]
pub struct ServiceStatus {
    pub status: &'static str,
    pub time: String,
    pub message: &'static str,
    pub writes_enabled: bool,
}
