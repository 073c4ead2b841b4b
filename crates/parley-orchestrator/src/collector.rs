use parley_contract::{gen_message_id, Fragment, Message, Role};

/// Collector for streamed reply fragments.
///
/// Accumulates fragments in emission order so the final assembled message
/// (the concatenation of everything emitted so far) can be persisted on any
/// exit path, including cancellation.
#[derive(Debug, Default)]
pub struct ReplyCollector {
    role: Option<Role>,
    content: String,
    fragments: usize,
}

impl ReplyCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one fragment.
    pub fn push(&mut self, fragment: &Fragment) {
        self.role.get_or_insert(fragment.role);
        self.content.push_str(&fragment.content);
        self.fragments += 1;
    }

    /// Number of fragments collected so far.
    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    /// The accumulated content so far.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Assemble the final message. `None` when nothing was emitted.
    pub fn finish(self) -> Option<Message> {
        if self.fragments == 0 {
            return None;
        }
        Some(Message {
            id: Some(gen_message_id()),
            role: self.role.unwrap_or(Role::Assistant),
            content: self.content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenates_in_emission_order() {
        let mut collector = ReplyCollector::new();
        for chunk in ["The ", "quick ", "brown ", "fox"] {
            collector.push(&Fragment::assistant(chunk));
        }
        assert_eq!(collector.fragment_count(), 4);
        assert_eq!(collector.content(), "The quick brown fox");

        let message = collector.finish().unwrap();
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content, "The quick brown fox");
        assert!(message.id.is_some());
    }

    #[test]
    fn finish_empty_is_none() {
        assert!(ReplyCollector::new().finish().is_none());
    }

    #[test]
    fn role_comes_from_first_fragment() {
        let mut collector = ReplyCollector::new();
        collector.push(&Fragment {
            role: Role::System,
            content: "note".to_string(),
        });
        collector.push(&Fragment::assistant(" more"));
        assert_eq!(collector.finish().unwrap().role, Role::System);
    }
}
