use uuid::Uuid;

/// Generate a fresh opaque token: a UUID v4 in canonical text form, drawn
/// from the OS CSPRNG. Used for both session ids and reset tokens.
pub fn new_token() -> String {
    Uuid::new_v4().to_string()
}
