/// Suggested bug categories offered by the "new bug" form.
///
/// Purely advisory: `Bug.category` is free text and is never validated
/// against this list.
pub const SUGGESTED_CATEGORIES: [&str; 8] = [
    "Authentication",
    "User Profile",
    "API",
    "Reporting",
    "UI/UX",
    "Notifications",
    "Database",
    "Performance",
];
