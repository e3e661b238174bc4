use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use bedrock_kernel::{Action, Ctx, ProcId, Process, Resume, SimError, aux};
use fabric_core::{Request, Signal};
use fabric_config::QueueParams;

pub type SharedQueue = Rc<RefCell<Queue>>;

/// Outcome of an enqueue attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    Accepted,
    Overflow,
}

/// Fixed-capacity FIFO keyed by byte-fullness.
///
/// Capacity is `depth × width` bytes. A request is admitted whole or not at
/// all; `fullness` is always the exact byte-sum of resident requests. The
/// overflow/underflow flags mirror the most recent attempt and are capacity
/// events, not errors.
pub struct Queue {
    name: String,
    depth: u64,
    width: u64,
    fullness: u64,
    overflow: bool,
    underflow: bool,
    items: VecDeque<Request>,
    /// Grant routing: queue name (as stamped in `Request::src`) → procedure.
    /// When procedures share a queue, the last binding wins.
    procedures: HashMap<String, ProcId>,
}

impl Queue {
    pub fn new(name: impl Into<String>, params: &QueueParams) -> Self {
        Self {
            name: name.into(),
            depth: params.depth,
            width: params.width,
            fullness: 0,
            overflow: false,
            underflow: false,
            items: VecDeque::new(),
            procedures: HashMap::new(),
        }
    }

    pub fn new_shared(name: impl Into<String>, params: &QueueParams) -> SharedQueue {
        Rc::new(RefCell::new(Self::new(name, params)))
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.depth * self.width
    }

    pub fn fullness(&self) -> u64 {
        self.fullness
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fullness == 0
    }

    pub fn is_overflow(&self) -> bool {
        self.overflow
    }

    pub fn is_underflow(&self) -> bool {
        self.underflow
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bind_procedure(&mut self, queue_name: impl Into<String>, procedure: ProcId) {
        self.procedures.insert(queue_name.into(), procedure);
    }

    pub fn grant_target(&self, queue_name: &str) -> Option<ProcId> {
        self.procedures.get(queue_name).copied()
    }

    /// Admits `request` whole, or rejects it without touching storage.
    pub fn enqueue(&mut self, now: f64, request: Request) -> Enqueue {
        if self.fullness + request.size > self.capacity_bytes() {
            self.overflow = true;
            aux::debug(
                now,
                &self.name,
                &format!("Overflow: fullness={}, request={}", self.fullness, request.size),
            );
            return Enqueue::Overflow;
        }

        self.fullness += request.size;
        self.overflow = false;
        aux::debug(now, &self.name, &format!("Enqueue: {request:?}"));
        self.items.push_back(request);
        aux::debug(
            now,
            &self.name,
            &format!("Items currently in queue ({})", self.items.len()),
        );
        debug_assert_eq!(self.fullness, self.items.iter().map(|r| r.size).sum::<u64>());
        Enqueue::Accepted
    }

    /// Removes the head request, or flags underflow on an empty queue.
    pub fn pop(&mut self, now: f64) -> Option<Request> {
        match self.items.pop_front() {
            Some(request) => {
                self.fullness -= request.size;
                self.underflow = false;
                aux::debug(now, &self.name, &format!("Dequeue completed: {request:?}"));
                Some(request)
            }
            None => {
                self.underflow = true;
                aux::debug(now, &self.name, &format!("Underflow: fullness={}", self.fullness));
                None
            }
        }
    }
}

/// One-shot process spawned by the fabric for each queue of the granted
/// initiator. Pops the head request, grants the issuing procedure, then
/// hands the request to the fabric. Grant is raised first so the procedure
/// observes its freed slot before the fabric observes the dequeue.
pub struct DequeueJob {
    queue: SharedQueue,
    fabric: ProcId,
}

impl DequeueJob {
    pub fn new(queue: SharedQueue, fabric: ProcId) -> Self {
        Self { queue, fabric }
    }
}

impl Process<Signal> for DequeueJob {
    fn name(&self) -> &str {
        "DequeueJob"
    }

    fn step(&mut self, resume: Resume<Signal>, ctx: &mut Ctx<'_, Signal>) -> Action<Signal> {
        match resume {
            Resume::Start => {
                let now = ctx.now();
                let popped = self.queue.borrow_mut().pop(now);
                if let Some(request) = popped {
                    let grant_to = self.queue.borrow().grant_target(&request.src.queue);
                    let Some(procedure) = grant_to else {
                        return Action::Fail(SimError::Protocol {
                            component: self.queue.borrow().name().to_string(),
                            detail: format!("no procedure bound for queue '{}'", request.src.queue),
                        });
                    };
                    aux::debug(
                        now,
                        self.queue.borrow().name(),
                        &format!("Sending \"Grant\" to procedure of \"{}\"", request.src.queue),
                    );
                    ctx.interrupt(procedure, Signal::Grant);
                    ctx.interrupt(self.fabric, Signal::InitiatorDequeue(request));
                }
                Action::Halt
            }
            _ => Action::Halt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_core::{AddrGen, Operation, Origin};

    fn request(size: u64) -> Request {
        Request {
            operation: Operation::Write,
            src: Origin { initiator: "CPU".into(), queue: "WRQ".into() },
            dst: "SRAM".into(),
            size,
            addr_gen: AddrGen::Random,
            timestamp: 0.0,
        }
    }

    #[test]
    fn third_enqueue_overflows_at_eight_bytes() {
        // depth=2, width=4 -> capacity 8 bytes.
        let mut q = Queue::new("Queue_CPU_WRQ", &QueueParams { depth: 2, width: 4 });
        assert_eq!(q.enqueue(0.0, request(4)), Enqueue::Accepted);
        assert_eq!(q.enqueue(0.0, request(4)), Enqueue::Accepted);
        assert!(!q.is_overflow());

        assert_eq!(q.enqueue(0.0, request(4)), Enqueue::Overflow);
        assert!(q.is_overflow());
        assert_eq!(q.fullness(), 8);
        assert_eq!(q.len(), 2);

        // One dequeue frees room; the next enqueue clears the flag.
        assert!(q.pop(1.0).is_some());
        assert_eq!(q.fullness(), 4);
        assert_eq!(q.enqueue(1.0, request(4)), Enqueue::Accepted);
        assert!(!q.is_overflow());
        assert_eq!(q.fullness(), 8);
    }

    #[test]
    fn fullness_tracks_byte_sum_exactly() {
        let mut q = Queue::new("Queue_CPU_WRQ", &QueueParams { depth: 8, width: 16 });
        q.enqueue(0.0, request(16));
        q.enqueue(0.0, request(32));
        q.enqueue(0.0, request(8));
        assert_eq!(q.fullness(), 56);
        let head = q.pop(0.0).unwrap();
        assert_eq!(head.size, 16);
        assert_eq!(q.fullness(), 40);
    }

    #[test]
    fn empty_pop_flags_underflow_without_side_effects() {
        let mut q = Queue::new("Queue_CPU_WRQ", &QueueParams { depth: 2, width: 4 });
        assert!(q.pop(0.0).is_none());
        assert!(q.is_underflow());
        assert_eq!(q.fullness(), 0);

        q.enqueue(0.0, request(4));
        assert!(q.pop(0.0).is_some());
        assert!(!q.is_underflow());
    }

    #[test]
    fn oversized_request_is_rejected_whole() {
        let mut q = Queue::new("Queue_CPU_WRQ", &QueueParams { depth: 2, width: 4 });
        q.enqueue(0.0, request(6));
        // 6 + 4 > 8: nothing of the second request may enter.
        assert_eq!(q.enqueue(0.0, request(4)), Enqueue::Overflow);
        assert_eq!(q.fullness(), 6);
        assert_eq!(q.len(), 1);
    }
}
