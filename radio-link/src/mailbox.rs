/// Single-slot receive buffer. Posting into a full slot replaces its content.
#[derive(Debug, Clone)]
pub struct Mailbox<T> {
    slot: Option<T>,
    overwritten: u32,
}

impl<T> Mailbox<T> {
    pub const fn new() -> Self {
        Self {
            slot: None,
            overwritten: 0,
        }
    }

    /// Returns true if an unread item was replaced.
    pub fn post(&mut self, item: T) -> bool {
        let replaced = self.slot.replace(item).is_some();

        if replaced {
            self.overwritten = self.overwritten.wrapping_add(1);
        }

        replaced
    }

    pub fn take(&mut self) -> Option<T> {
        self.slot.take()
    }

    pub fn is_full(&self) -> bool {
        self.slot.is_some()
    }

    pub fn overwritten(&self) -> u32 {
        self.overwritten
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
