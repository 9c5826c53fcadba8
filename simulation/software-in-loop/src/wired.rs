use std::{any::Any, cell::RefCell, collections::VecDeque, rc::Rc};

use shared::comms_hal::WiredLink;

type LineQueue = Rc<RefCell<VecDeque<String>>>;

/// One end of a simulated serial cable. Lines written here are read at the other end.
pub struct WiredEnd {
    incoming: LineQueue,
    outgoing: LineQueue,
    written: Vec<String>,
}

impl WiredLink for WiredEnd {
    fn write_line(&mut self, line: &str) {
        self.outgoing.borrow_mut().push_back(line.to_string());
        self.written.push(line.to_string());
    }

    fn read_line(&mut self) -> Option<String> {
        self.incoming.borrow_mut().pop_front()
    }

    fn as_mut_any(&mut self) -> &mut dyn Any {
        self
    }
}

impl WiredEnd {
    /// Every line this end has written so far.
    pub fn written(&self) -> &[String] {
        &self.written
    }

    pub fn pending_incoming(&self) -> usize {
        self.incoming.borrow().len()
    }
}

pub fn wired_pair() -> (WiredEnd, WiredEnd) {
    let a_to_b: LineQueue = Rc::new(RefCell::new(VecDeque::new()));
    let b_to_a: LineQueue = Rc::new(RefCell::new(VecDeque::new()));

    let a = WiredEnd {
        incoming: b_to_a.clone(),
        outgoing: a_to_b.clone(),
        written: Vec::new(),
    };
    let b = WiredEnd {
        incoming: a_to_b,
        outgoing: b_to_a,
        written: Vec::new(),
    };

    (a, b)
}
