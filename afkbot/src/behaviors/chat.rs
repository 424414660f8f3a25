//! Chat playback: the configured lines once, or on a loop.

use std::time::Duration;

use afkbot_sdk::client::ClientHandle;

use crate::config::ChatMessages;
use crate::timers::TimerSet;

/// Endless cursor over a fixed list of lines.
#[derive(Debug, Clone)]
pub struct ChatCycle {
    messages: Vec<String>,
    next: usize,
}

impl ChatCycle {
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages, next: 0 }
    }

    /// Index of the line the next call will return.
    pub fn position(&self) -> usize {
        self.next
    }

    /// Current line, then step forward, wrapping after the last.
    pub fn next_message(&mut self) -> Option<&str> {
        if self.messages.is_empty() {
            return None;
        }
        let index = self.next;
        self.next = (self.next + 1) % self.messages.len();
        Some(&self.messages[index])
    }
}

pub fn start(cfg: &ChatMessages, handle: &ClientHandle, timers: &mut TimerSet) {
    tracing::info!("Started chat-messages module");
    let handle = handle.clone();

    if cfg.repeat {
        let mut cycle = ChatCycle::new(cfg.messages.clone());
        timers.every("chat-messages", Duration::from_secs(cfg.repeat_delay), move || {
            let line = cycle.next_message().map(str::to_owned);
            let handle = handle.clone();
            async move {
                if let Some(line) = line {
                    handle.chat(&line).await?;
                }
                anyhow::Ok(())
            }
        });
    } else {
        let messages = cfg.messages.clone();
        timers.after("chat-messages", Duration::ZERO, async move {
            for line in &messages {
                handle.chat(line).await?;
            }
            anyhow::Ok(())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_through_three_lines() {
        let mut cycle = ChatCycle::new(vec!["a".into(), "b".into(), "c".into()]);
        let mut seen = Vec::new();
        for _ in 0..7 {
            seen.push(cycle.position());
            cycle.next_message();
        }
        assert_eq!(seen, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn cursor_stays_in_bounds_over_long_runs() {
        let mut cycle = ChatCycle::new(vec!["x".into(), "y".into(), "z".into()]);
        for _ in 0..100_000 {
            assert!(cycle.next_message().is_some());
            assert!(cycle.position() < 3);
        }
    }

    #[test]
    fn empty_list_yields_nothing() {
        let mut cycle = ChatCycle::new(Vec::new());
        assert_eq!(cycle.next_message(), None);
    }
}
