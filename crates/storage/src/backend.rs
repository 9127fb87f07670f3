//! The storage backend interface.

use alloc::rc::Rc;
use alloc::vec::Vec;
use reflux_core::{ChangeEvent, DocId, Document, Result, Sequence};
use reflux_query::{QueryFunctions, QueryParams};

/// Documents returned by a full query.
#[derive(Clone, Debug, Default)]
pub struct QueryResult {
    /// Matching documents in comparator order, with skip and limit applied.
    pub documents: Vec<Rc<Document>>,
    /// Sequence of the last write the documents reflect.
    pub sequence: Sequence,
}

impl QueryResult {
    pub fn new(documents: Vec<Rc<Document>>, sequence: Sequence) -> Self {
        Self { documents, sequence }
    }
}

/// A document store the reactive layer runs queries against.
///
/// The backend supplies the comparator and matcher for a query shape through
/// its `QueryFunctions` implementation; `query` must honor the prepared
/// parameters it is given so that its result equals what the event-reduce
/// engine maintains.
#[allow(async_fn_in_trait)]
pub trait StorageBackend: QueryFunctions {
    /// Name of the field holding document ids.
    fn primary_key(&self) -> &str;

    /// Runs a full query: filter, sort, skip, limit.
    ///
    /// The result reflects every write up to and including
    /// `QueryResult::sequence` and none after it.
    async fn query(&self, params: &QueryParams) -> Result<QueryResult>;

    /// Fetches the given documents. Unknown and deleted ids are skipped.
    async fn find_documents_by_id(&self, ids: &[DocId]) -> Result<Vec<Rc<Document>>>;

    /// Takes every committed change not yet handed out, in sequence order.
    fn drain_changes(&self) -> Vec<ChangeEvent>;
}
