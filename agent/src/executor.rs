use parley_contract::{AgentExecutor, Fragment, FragmentStream, Message, Role};
use std::time::Duration;

/// Deterministic local-development executor: replies word by word, echoing
/// the inbound message and numbering the turn from the thread history.
///
/// This is the seam where a real reasoning graph plugs in; the starter
/// binary ships it so the service runs end to end without any provider.
pub struct EchoExecutor {
    delay: Duration,
}

impl EchoExecutor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl AgentExecutor for EchoExecutor {
    fn stream(&self, history: &[Message], input: &Message) -> FragmentStream {
        let turn = history.iter().filter(|m| m.role == Role::User).count() + 1;
        let reply = format!("[turn {turn}] {}", input.content);
        let delay = self.delay;
        Box::pin(async_stream::stream! {
            for (i, word) in reply.split_whitespace().enumerate() {
                if i > 0 {
                    tokio::time::sleep(delay).await;
                    yield Ok(Fragment::assistant(format!(" {word}")));
                } else {
                    yield Ok(Fragment::assistant(word.to_string()));
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn echo_reply_numbers_the_turn_from_history() {
        let executor = EchoExecutor::new(Duration::ZERO);
        let history = vec![
            Message::user("earlier"),
            Message::assistant("[turn 1] earlier"),
        ];

        let reply = executor
            .invoke(&history, &Message::user("hello again"))
            .await
            .unwrap();
        assert_eq!(reply.content, "[turn 2] hello again");
    }

    #[tokio::test]
    async fn echo_streams_one_fragment_per_word() {
        let executor = EchoExecutor::new(Duration::ZERO);
        let chunks: Vec<String> = executor
            .stream(&[], &Message::user("two words"))
            .map(|f| f.unwrap().content)
            .collect()
            .await;
        assert_eq!(chunks, vec!["[turn", " 1]", " two", " words"]);
    }
}
