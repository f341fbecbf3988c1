//! Optical-media device descriptors. Invoking the configured commands is
//! explicitly out of scope (see the scope note in the system overview) —
//! this module only carries the data the job engine and archive engine
//! need to decide volume boundaries and to prompt an operator.

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Device {
    pub name: String,
    pub request_command: Option<String>,
    pub load_command: Option<String>,
    pub unload_command: Option<String>,
    pub image_command: Option<String>,
    pub ecc_command: Option<String>,
    pub blank_command: Option<String>,
    pub write_command: Option<String>,
    pub volume_size: u64,
}

impl Device {
    pub fn new(name: impl Into<String>, volume_size: u64) -> Self {
        Device {
            name: name.into(),
            volume_size,
            ..Default::default()
        }
    }
}
