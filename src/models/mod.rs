//! Data models for ShareIt

pub mod booking;
pub mod comment;
pub mod item;
pub mod request;
pub mod user;

use std::borrow::Cow;

use validator::ValidationError;

// Re-export commonly used types
pub use booking::{Booking, BookingDto, BookingState, BookingStatus, CreateBooking};
pub use comment::{Comment, CommentDto, CreateComment};
pub use item::{CreateItem, Item, ItemDto, ItemWithBookingsDto, UpdateItem};
pub use request::{CreateItemRequest, ItemForRequestDto, ItemRequest, ItemRequestDto};
pub use user::{CreateUser, UpdateUser, User, UserDto};

/// Rejects strings made only of whitespace (validator custom rule)
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some(Cow::Borrowed("must not be blank"));
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_blank() {
        assert!(not_blank("drill").is_ok());
        assert!(not_blank("").is_err());
        assert!(not_blank("   \t").is_err());
    }
}
