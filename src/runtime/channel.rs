use std::collections::{HashMap, VecDeque};

use crate::runtime::value::Num;

type Message = Vec<Num>;

#[derive(Debug)]
struct SendBuilder {
    channel: String,
    expected: usize,
    values: Message,
}

#[derive(Debug)]
struct ReceiveBuilder {
    channel: String,
    expected: usize,
    message: Message,
}

/// Outcome of binding one received element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Received {
    pub value: Num,
    /// Set on the last element of a complete message.
    pub complete: bool,
}

/// Named FIFO queues plus the single in-flight send and receive.
///
/// A message only becomes visible on its queue once every one of its
/// arguments has arrived.
#[derive(Debug, Default)]
pub struct Channels {
    queues: HashMap<String, VecDeque<Message>>,
    sending: Option<SendBuilder>,
    receiving: Option<ReceiveBuilder>,
}

impl Channels {
    fn publish(&mut self, channel: String, message: Message) {
        tracing::trace!(%channel, len = message.len(), "message published");
        self.queues.entry(channel).or_default().push_back(message);
    }

    pub fn send(&mut self, channel: &str, expected: usize) {
        if let Some(prev) = self.sending.take() {
            tracing::debug!(
                channel = %prev.channel,
                got = prev.values.len(),
                expected = prev.expected,
                "discarding incomplete message"
            );
        }

        if expected == 0 {
            self.publish(channel.to_string(), vec![]);
            return;
        }

        self.sending = Some(SendBuilder {
            channel: channel.to_string(),
            expected,
            values: Vec::with_capacity(expected),
        });
    }

    pub fn send_arg(&mut self, channel: &str, value: Num) {
        let Some(builder) = self.sending.as_mut() else {
            return;
        };

        if builder.channel != channel {
            return;
        }

        builder.values.push(value);

        if builder.values.len() == builder.expected {
            if let Some(builder) = self.sending.take() {
                self.publish(builder.channel, builder.values);
            }
        }
    }

    /// Pops the front message without blocking; an empty queue yields an
    /// empty message.
    pub fn receive(&mut self, channel: &str, expected: usize) {
        let message = self
            .queues
            .get_mut(channel)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_default();

        self.receiving = Some(ReceiveBuilder {
            channel: channel.to_string(),
            expected,
            message,
        });
    }

    pub fn recv_arg(&mut self, channel: &str, index: usize) -> Received {
        let Some(builder) = self.receiving.as_ref() else {
            return Received {
                value: Num::Int(0),
                complete: false,
            };
        };

        if builder.channel != channel {
            return Received {
                value: Num::Int(0),
                complete: false,
            };
        }

        let value = builder.message.get(index).copied().unwrap_or(Num::Int(0));
        let last = index + 1 >= builder.expected;
        let complete = last && builder.message.len() == builder.expected;

        if last {
            self.receiving = None;
        }

        Received { value, complete }
    }

    pub fn pending(&self, channel: &str) -> usize {
        self.queues.get(channel).map_or(0, |queue| queue.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_message_is_never_visible() {
        let mut channels = Channels::default();

        channels.send("c", 2);
        channels.send_arg("c", Num::Int(1));
        assert_eq!(channels.pending("c"), 0);

        channels.receive("c", 2);
        assert_eq!(
            channels.recv_arg("c", 0),
            Received {
                value: Num::Int(0),
                complete: false
            }
        );
        assert!(!channels.recv_arg("c", 1).complete);
    }

    #[test]
    fn new_send_overwrites_incomplete_one() {
        let mut channels = Channels::default();

        channels.send("c", 2);
        channels.send_arg("c", Num::Int(1));
        channels.send("c", 1);
        channels.send_arg("c", Num::Float(2.5));
        assert_eq!(channels.pending("c"), 1);

        channels.receive("c", 1);
        assert_eq!(
            channels.recv_arg("c", 0),
            Received {
                value: Num::Float(2.5),
                complete: true
            }
        );
    }

    #[test]
    fn messages_are_fifo() {
        let mut channels = Channels::default();

        for n in [1, 2] {
            channels.send("c", 1);
            channels.send_arg("c", Num::Int(n));
        }

        channels.receive("c", 1);
        assert_eq!(channels.recv_arg("c", 0).value, Num::Int(1));
        channels.receive("c", 1);
        assert_eq!(channels.recv_arg("c", 0).value, Num::Int(2));
        assert_eq!(channels.pending("c"), 0);
    }

    #[test]
    fn args_for_other_channel_are_ignored() {
        let mut channels = Channels::default();

        channels.send("a", 1);
        channels.send_arg("b", Num::Int(9));
        assert_eq!(channels.pending("a"), 0);
        assert_eq!(channels.pending("b"), 0);
    }

    #[test]
    fn empty_send_publishes_immediately() {
        let mut channels = Channels::default();

        channels.send("c", 0);
        assert_eq!(channels.pending("c"), 1);
    }

    #[test]
    fn out_of_range_index_reads_zero() {
        let mut channels = Channels::default();

        channels.send("c", 1);
        channels.send_arg("c", Num::Int(5));
        channels.receive("c", 3);
        assert_eq!(channels.recv_arg("c", 0).value, Num::Int(5));
        assert_eq!(channels.recv_arg("c", 1).value, Num::Int(0));
        assert!(!channels.recv_arg("c", 2).complete);
    }
}
