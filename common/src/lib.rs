pub mod apps;
pub mod error;
pub mod partition;
pub mod rpc;
pub mod split;
pub mod store;
pub mod task;

pub use apps::{KeyValue, MapReduceApp};
pub use error::MrError;
pub use rpc::{
    DoneResponse, JobStatus, TaskAssignment, TaskCompleteRequest, TaskCompleteResponse,
    TaskCounts, TaskFailedRequest, TaskFailedResponse, TaskRequest, PROTOCOL_VERSION,
};
pub use task::{Phase, TaskId, TaskKind, WorkerId};
