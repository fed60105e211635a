pub mod company;
pub mod domain;
pub mod person;

use super::SENTINEL;

pub(crate) fn is_unset(value: &str) -> bool {
    value == SENTINEL
}
