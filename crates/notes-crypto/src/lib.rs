/// Notes Crypto Library
///
/// Password credentials only. Registration always stores an argon2id PHC
/// string; verification still accepts plaintext credentials written before
/// hashing was introduced so those accounts keep working. Plaintext records
/// are a known weakness and are logged by callers when they authenticate.

pub mod password;

pub use password::{PasswordError, hash_password, is_hashed, verify_password};
