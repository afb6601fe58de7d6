use uuid::Uuid;

/// Generates node and sub-record ids.
///
/// Random mode hands out v4 UUIDs. Seeded mode produces `{seed}-{n}` so
/// tests can predict ids; a seeded generator never repeats an id.
#[derive(Clone, Debug, Default)]
pub struct IdGenerator {
    seed: Option<String>,
    count: u32,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: Some(seed.into()),
            count: 0,
        }
    }

    /// Generate the next id
    pub fn new_id(&mut self) -> String {
        match &self.seed {
            Some(seed) => {
                self.count += 1;
                format!("{}-{}", seed, self.count)
            }
            None => Uuid::new_v4().to_string(),
        }
    }

    pub fn seed(&self) -> Option<&str> {
        self.seed.as_deref()
    }
}

/// Fresh random id, for call sites without a generator at hand.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_seeded_ids_are_sequential() {
        let mut gen = IdGenerator::from_seed("tpl");

        assert_eq!(gen.new_id(), "tpl-1");
        assert_eq!(gen.new_id(), "tpl-2");
        assert_eq!(gen.seed(), Some("tpl"));
    }

    #[test]
    fn test_random_ids_do_not_repeat() {
        let mut gen = IdGenerator::new();
        let ids: HashSet<String> = (0..100).map(|_| gen.new_id()).collect();
        assert_eq!(ids.len(), 100);
    }
}
