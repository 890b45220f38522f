pub mod avatar;
pub mod cell;
pub mod colors;
pub mod reservation;

pub use avatar::{AVATAR_SIZE, Avatar, AvatarCache, AvatarPixel};
pub use cell::*;
pub use colors::owner_color;
pub use reservation::{BorderBand, NoReservation, Reservation, ReservedSet};
