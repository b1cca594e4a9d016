//! Prefixed identifier generation.
//!
//! Every persisted entity carries an id of the form `<prefix>_<8-hex>`
//! (`ses_3fa91b02`, `agt_00c4d1ee`, ...). Prefixes are fixed per entity kind;
//! artifact ids are additionally collision-checked against the whole state
//! tree by the store before use.

use rand::Rng;

/// Returns a fresh id of the form `<prefix>_<8-hex>`.
pub fn new_prefixed_id(prefix: &str) -> String {
    let raw: u32 = rand::thread_rng().gen();
    format!("{}_{:08x}", prefix, raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_id_shape() {
        let id = new_prefixed_id("ses");
        assert!(id.starts_with("ses_"));
        let hex = &id["ses_".len()..];
        assert_eq!(hex.len(), 8);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_prefixed_ids_differ() {
        let a = new_prefixed_id("art");
        let b = new_prefixed_id("art");
        assert_ne!(a, b);
    }
}
