use uuid::Uuid;

use crate::runtime::asset::ListRef;
use crate::runtime::cursor::CursorId;
use crate::runtime::invocation::Invocation;

/// Channel through which a node asks the engine to act on other lists.
/// Requests are applied after the node's step returns.
pub trait Syscall {
    /// Queues an invocation and returns the id the new cursor will carry.
    fn run_list(&mut self, invocation: Invocation) -> CursorId;

    /// Kills every cursor running `list`.
    fn stop_list(&mut self, list: ListRef);
}

#[derive(Debug)]
pub(crate) enum Request {
    Run { id: CursorId, invocation: Invocation },
    Stop(ListRef),
}

#[derive(Debug, Default)]
pub(crate) struct PendingSyscalls {
    requests: Vec<Request>,
}

impl PendingSyscalls {
    pub(crate) fn into_requests(self) -> Vec<Request> {
        self.requests
    }
}

impl Syscall for PendingSyscalls {
    fn run_list(&mut self, invocation: Invocation) -> CursorId {
        let id = Uuid::new_v4();
        self.requests.push(Request::Run { id, invocation });
        id
    }

    fn stop_list(&mut self, list: ListRef) {
        self.requests.push(Request::Stop(list));
    }
}
