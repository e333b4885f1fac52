use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
}

impl Tag {
    /// New tag with a random color. Returns `None` for a blank name.
    pub fn new<R: Rng + ?Sized>(name: &str, rng: &mut R) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            color: random_color(rng),
            user_id: None,
        })
    }
}

/// `#rrggbb` from a uniformly sampled 24-bit value
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    let value: u32 = rng.gen_range(0..0x100_0000);
    format!("#{:06x}", value)
}
