use rand::Rng;
use std::fmt;

/// Number of characters in a correlation identifier.
pub const CORRELATION_ID_LEN: usize = 32;

/// Random token tagging one request so its reply can be picked out of the
/// reply queue. 26^32 possible values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let id = (0..CORRELATION_ID_LEN)
            .map(|_| char::from(rng.random_range(b'a'..=b'z')))
            .collect();
        CorrelationId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn has_fixed_length_and_lowercase_alphabet() {
        let id = CorrelationId::generate();
        assert_eq!(id.as_str().len(), CORRELATION_ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn ten_thousand_ids_do_not_collide() {
        let ids: HashSet<CorrelationId> = (0..10_000).map(|_| CorrelationId::generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn ids_from_concurrent_threads_do_not_collide() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    (0..2_000)
                        .map(|_| CorrelationId::generate())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate correlation id");
            }
        }
        assert_eq!(seen.len(), 16_000);
    }
}
