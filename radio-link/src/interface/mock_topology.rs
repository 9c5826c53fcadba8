use std::sync::{Arc, Mutex};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::mailbox::Mailbox;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirPayload {
    pub from: usize,
    pub data: Vec<u8>,
    pub delivered: bool,
}

/// Shared medium for mock radios. Every transmission reaches each other radio's
/// single receive slot unless the loss model drops it.
#[derive(Debug)]
pub struct MockAir {
    mailboxes: Vec<Mailbox<Vec<u8>>>,
    muted: Vec<bool>,
    link_down: bool,
    drop_probability: f64,
    rng: StdRng,
    payload_log: Option<Vec<AirPayload>>,
}

impl MockAir {
    pub fn new(seed: u64) -> Self {
        Self {
            mailboxes: Vec::new(),
            muted: Vec::new(),
            link_down: false,
            drop_probability: 0.0,
            rng: StdRng::seed_from_u64(seed),
            payload_log: None,
        }
    }

    pub fn new_shared(seed: u64) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::new(seed)))
    }

    pub fn register_radio(&mut self) -> usize {
        self.mailboxes.push(Mailbox::new());
        self.muted.push(false);

        self.mailboxes.len() - 1
    }

    pub fn transmit(&mut self, from: usize, data: &[u8]) {
        let delivered = !self.link_down
            && !self.muted.get(from).copied().unwrap_or(false)
            && !self.roll_drop();

        if delivered {
            for (radio_id, mailbox) in self.mailboxes.iter_mut().enumerate() {
                if radio_id != from {
                    mailbox.post(data.to_vec());
                }
            }
        }

        if let Some(log) = &mut self.payload_log {
            log.push(AirPayload {
                from,
                data: data.to_vec(),
                delivered,
            });
        }
    }

    pub fn take(&mut self, radio_id: usize) -> Option<Vec<u8>> {
        self.mailboxes.get_mut(radio_id)?.take()
    }

    fn roll_drop(&mut self) -> bool {
        self.drop_probability > 0.0 && self.rng.gen_bool(self.drop_probability.min(1.0))
    }

    /// Drops every transmission until cleared.
    pub fn set_link_down(&mut self, down: bool) {
        self.link_down = down;
    }

    /// Drops only what the given radio transmits.
    pub fn set_muted(&mut self, radio_id: usize, muted: bool) {
        if let Some(flag) = self.muted.get_mut(radio_id) {
            *flag = muted;
        }
    }

    pub fn set_drop_probability(&mut self, probability: f64) {
        self.drop_probability = probability.max(0.0);
    }

    pub fn enable_payload_logging(&mut self) {
        if self.payload_log.is_none() {
            self.payload_log = Some(Vec::new());
        }
    }

    pub fn take_payload_log(&mut self) -> Vec<AirPayload> {
        match &mut self.payload_log {
            Some(log) => std::mem::take(log),
            None => Vec::new(),
        }
    }
}
