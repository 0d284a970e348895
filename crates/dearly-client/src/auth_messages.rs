/// Shown when an auth error code is not in the table.
pub const FALLBACK_AUTH_MESSAGE: &str = "Something went wrong. Please try again.";

const AUTH_MESSAGES: &[(&str, &str)] = &[
    ("auth/invalid-credentials", "Incorrect email or password. Please try again."),
    ("auth/wrong-password", "Incorrect email or password. Please try again."),
    ("auth/user-not-found", "No account found with this email."),
    ("auth/email-already-in-use", "An account with this email already exists."),
    ("auth/weak-password", "Password must be at least 8 characters long."),
    ("auth/invalid-email", "Please enter a valid email address."),
    ("auth/unauthorized", "Your session has expired. Please sign in again."),
    ("auth/too-many-requests", "Too many attempts. Please wait a moment and try again."),
    ("auth/network-request-failed", "Network error. Check your connection and try again."),
    ("auth/popup-closed-by-user", "Sign-in was cancelled."),
];

/// Friendly text for an auth error code such as `auth/weak-password`.
pub fn auth_error_message(code: &str) -> &'static str {
    AUTH_MESSAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, message)| *message)
        .unwrap_or(FALLBACK_AUTH_MESSAGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_have_messages() {
        assert_eq!(
            auth_error_message("auth/email-already-in-use"),
            "An account with this email already exists."
        );
        assert_eq!(
            auth_error_message("auth/invalid-credentials"),
            auth_error_message("auth/wrong-password")
        );
    }

    #[test]
    fn unknown_codes_fall_back() {
        assert_eq!(auth_error_message("auth/something-new"), FALLBACK_AUTH_MESSAGE);
        assert_eq!(auth_error_message(""), FALLBACK_AUTH_MESSAGE);
    }
}
