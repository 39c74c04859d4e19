//! User identity and display details carried by events.

use std::fmt;

use uuid::Uuid;

/// Identity of a chat participant.
pub type UserId = Uuid;

/// RGB color used for avatar rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Display details of a user at the time an event was produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDetails {
    pub name: String,
    pub initials: String,
    /// Background color.
    pub primary_color: Rgb,
    /// Foreground color.
    pub secondary_color: Rgb,
}

impl UserDetails {
    /// Details with initials derived from the name and a white foreground.
    pub fn new(name: impl Into<String>, primary_color: Rgb) -> Self {
        let name = name.into();
        Self {
            initials: initials_from_name(&name),
            name,
            primary_color,
            secondary_color: Rgb::WHITE,
        }
    }
}

/// First letter of the first two words, upper-cased.
pub fn initials_from_name(name: &str) -> String {
    name.split_whitespace()
        .take(2)
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Presence status shown next to a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum UserStatus {
    #[default]
    Available,
    Busy,
    Away,
}

/// Flags assigned to a user when joining.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct UserFlags {
    pub bot: bool,
}

/// Why a user left the chat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LeaveReason {
    #[default]
    Left,
    Disconnected,
}

/// Log-friendly `"<id> (<name>)"` rendering of a user.
pub struct UserIdentifier<'a> {
    pub id: UserId,
    pub details: &'a UserDetails,
}

impl fmt::Display for UserIdentifier<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.details.name)
    }
}
