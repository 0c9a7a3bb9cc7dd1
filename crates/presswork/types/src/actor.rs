use crate::UserId;
use serde::{Deserialize, Serialize};

/// The acting user behind a mutating operation.
///
/// Threaded through every workflow mutation so timeline records carry both
/// the stable user id and the display name as it read at the time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub display_name: String,
}

impl Actor {
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
        }
    }
}
