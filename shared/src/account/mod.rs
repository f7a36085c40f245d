pub mod handle;

use serde::{Deserialize, Serialize};

/// The role a user signs up with.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Role {
    Alumni,
    Student,
    Faculty,
}
