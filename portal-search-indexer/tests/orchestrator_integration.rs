//! Integration tests for the search indexer orchestrator.
//!
//! These tests use the real Orchestrator, processor and loader over an in-memory
//! portal store, with mock Kafka and OpenSearch boundaries.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;

use portal_search_indexer::assembler::AssemblerRegistry;
use portal_search_indexer::catalog::ParameterCatalog;
use portal_search_indexer::consumer::{EntityEvent, StreamMessage};
use portal_search_indexer::errors::IngestError;
use portal_search_indexer::loader::SearchLoader;
use portal_search_indexer::orchestrator::{Consumer, Orchestrator, OrchestratorConfig};
use portal_search_indexer::processor::{EntityProcessor, FailurePolicy};
use portal_search_indexer::schema::SchemaRegistry;
use portal_search_repository::{
    BatchOperationResult, BatchOperationSummary, DeleteDocumentRequest, InMemoryStore,
    SearchIndexError, SearchIndexProvider,
};
use portal_search_shared::{
    DatafileRecord, DatasetRecord, Document, EntityKind, ExperimentRecord, FieldValue,
    IndexSchema, ParameterDataType, ParameterDefinition, ParameterValue,
};

// Mock Consumer for testing
struct MockConsumer {
    events_to_send: Vec<EntityEvent>,
    error_on_subscribe: bool,
    /// Wait for a shutdown signal instead of sending events.
    wait_for_shutdown: bool,
    acknowledgments: Mutex<Vec<bool>>,
}

impl MockConsumer {
    fn new(events: Vec<EntityEvent>) -> Self {
        Self {
            events_to_send: events,
            error_on_subscribe: false,
            wait_for_shutdown: false,
            acknowledgments: Mutex::new(Vec::new()),
        }
    }

    fn with_subscribe_error(events: Vec<EntityEvent>) -> Self {
        Self {
            error_on_subscribe: true,
            ..Self::new(events)
        }
    }

    fn idle() -> Self {
        Self {
            wait_for_shutdown: true,
            ..Self::new(Vec::new())
        }
    }

    fn acknowledgments(&self) -> Vec<bool> {
        self.acknowledgments.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Consumer for MockConsumer {
    fn subscribe(&self) -> Result<(), IngestError> {
        if self.error_on_subscribe {
            Err(IngestError::KafkaError("Mock subscribe error".to_string()))
        } else {
            Ok(())
        }
    }

    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        mut ack_receiver: mpsc::Receiver<StreamMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError> {
        if self.wait_for_shutdown {
            let _ = shutdown.recv().await;
            let _ = sender.send(StreamMessage::End).await;
            return Ok(());
        }

        let events = self.events_to_send.clone();
        let offsets = vec![("portal.entity-changes".to_string(), 0, 1i64)];
        let _ = sender.send(StreamMessage::Events { events, offsets }).await;

        tokio::select! {
            _ = shutdown.recv() => {}
            Some(StreamMessage::Acknowledgment { success, error, .. }) = ack_receiver.recv() => {
                self.acknowledgments.lock().unwrap().push(success);
                if !success {
                    return Err(IngestError::batch_rejected(error.unwrap_or_default()));
                }
            }
        }

        let _ = sender.send(StreamMessage::End).await;
        Ok(())
    }
}

// Mock Search Provider for testing
struct MockSearchProvider {
    indexed_documents: Mutex<Vec<Document>>,
    deleted_documents: Mutex<Vec<DeleteDocumentRequest>>,
    ensured_schemas: Mutex<Vec<IndexSchema>>,
    /// Document the index refuses, as a mapping conflict would.
    rejected_id: Option<String>,
}

impl MockSearchProvider {
    fn new() -> Self {
        Self {
            indexed_documents: Mutex::new(Vec::new()),
            deleted_documents: Mutex::new(Vec::new()),
            ensured_schemas: Mutex::new(Vec::new()),
            rejected_id: None,
        }
    }

    fn rejecting(document_id: &str) -> Self {
        Self {
            rejected_id: Some(document_id.to_string()),
            ..Self::new()
        }
    }

    fn is_rejected(&self, document: &Document) -> bool {
        self.rejected_id.as_deref() == Some(document.document_id().as_str())
    }

    fn indexed(&self) -> Vec<Document> {
        self.indexed_documents.lock().unwrap().clone()
    }

    fn indexed_document(&self, document_id: &str) -> Option<Document> {
        self.indexed()
            .into_iter()
            .find(|d| d.document_id() == document_id)
    }

    fn deleted_ids(&self) -> Vec<String> {
        self.deleted_documents
            .lock()
            .unwrap()
            .iter()
            .map(DeleteDocumentRequest::document_id)
            .collect()
    }

    fn ensured_schema(&self, kind: EntityKind) -> Option<IndexSchema> {
        self.ensured_schemas
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| s.kind == kind)
            .cloned()
    }
}

fn summary(ids: Vec<String>) -> BatchOperationSummary {
    BatchOperationSummary::from_results(
        ids.into_iter()
            .map(|document_id| BatchOperationResult {
                document_id,
                success: true,
                error: None,
            })
            .collect(),
    )
}

#[async_trait::async_trait]
impl SearchIndexProvider for MockSearchProvider {
    async fn ensure_index_exists(&self, schema: &IndexSchema) -> Result<(), SearchIndexError> {
        self.ensured_schemas.lock().unwrap().push(schema.clone());
        Ok(())
    }

    async fn index_document(&self, document: &Document) -> Result<(), SearchIndexError> {
        self.indexed_documents.lock().unwrap().push(document.clone());
        Ok(())
    }

    async fn delete_document(&self, request: &DeleteDocumentRequest) -> Result<(), SearchIndexError> {
        self.deleted_documents.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn bulk_index_documents(
        &self,
        documents: &[Document],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let mut results = Vec::with_capacity(documents.len());
        for document in documents {
            let rejected = self.is_rejected(document);
            if !rejected {
                self.indexed_documents.lock().unwrap().push(document.clone());
            }
            results.push(BatchOperationResult {
                document_id: document.document_id(),
                success: !rejected,
                error: rejected.then(|| SearchIndexError::index("mapper_parsing_exception")),
            });
        }
        Ok(BatchOperationSummary::from_results(results))
    }

    async fn bulk_delete_documents(
        &self,
        requests: &[DeleteDocumentRequest],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        self.deleted_documents
            .lock()
            .unwrap()
            .extend(requests.iter().cloned());
        Ok(summary(requests.iter().map(|r| r.document_id()).collect()))
    }
}

fn definition(name: &str, kind: EntityKind, data_type: ParameterDataType) -> ParameterDefinition {
    ParameterDefinition::new(name, kind, data_type, true)
}

/// Experiment 1 with authors Alice and Bob and `beamline = "BL-4"`, dataset 2
/// "Beamtime run", datafile 3 "scan_001.nxs" with `energy = 12.5`.
fn populated_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());

    store.insert_experiment(ExperimentRecord {
        id: 1,
        title: "Neutron Study".to_string(),
        description: "desc".to_string(),
        institution_name: "ANSTO".to_string(),
        created_by: "alice".to_string(),
        created_time: Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap(),
        start_time: None,
        end_time: None,
        update_time: Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap(),
    });
    store.add_author(1, "Alice");
    store.add_author(1, "Bob");
    store.attach_parameter(
        1,
        ParameterValue::string(
            definition("beamline", EntityKind::Experiment, ParameterDataType::String),
            "BL-4",
        ),
    );

    store.insert_dataset(DatasetRecord {
        id: 2,
        experiment_id: 1,
        description: "Beamtime run".to_string(),
    });

    store.insert_datafile(DatafileRecord {
        id: 3,
        dataset_id: 2,
        filename: "scan_001.nxs".to_string(),
    });
    store.attach_parameter(
        3,
        ParameterValue::numeric(
            definition("energy", EntityKind::Datafile, ParameterDataType::Numeric),
            12.5,
        ),
    );

    store
}

struct TestHarness {
    orchestrator: Orchestrator,
    consumer: Arc<MockConsumer>,
    provider: Arc<MockSearchProvider>,
}

async fn create_test_orchestrator(
    store: Arc<InMemoryStore>,
    consumer: MockConsumer,
    policy: FailurePolicy,
) -> TestHarness {
    create_harness(store, consumer, MockSearchProvider::new(), policy).await
}

async fn create_harness(
    store: Arc<InMemoryStore>,
    consumer: MockConsumer,
    provider: MockSearchProvider,
    policy: FailurePolicy,
) -> TestHarness {
    let consumer = Arc::new(consumer);
    let provider = Arc::new(provider);

    let schemas = Arc::new(SchemaRegistry::load(ParameterCatalog::new(store.clone())).await);
    let processor = EntityProcessor::with_policy(AssemblerRegistry::new(store), policy);
    let loader = SearchLoader::new(provider.clone());

    let orchestrator = Orchestrator::new(consumer.clone(), processor, loader, schemas);

    TestHarness {
        orchestrator,
        consumer,
        provider,
    }
}

#[tokio::test]
async fn test_orchestrator_full_integration() {
    let events = vec![
        EntityEvent::upsert(EntityKind::Experiment, 1),
        EntityEvent::upsert(EntityKind::Dataset, 2),
        EntityEvent::upsert(EntityKind::Datafile, 3),
    ];
    let mut harness = create_test_orchestrator(
        populated_store(),
        MockConsumer::new(events),
        FailurePolicy::Skip,
    )
    .await;

    let result = timeout(Duration::from_secs(5), harness.orchestrator.run()).await;
    assert!(result.is_ok(), "Orchestrator should complete within timeout");
    assert!(result.unwrap().is_ok());

    assert_eq!(harness.consumer.acknowledgments(), vec![true]);
    assert_eq!(harness.provider.indexed().len(), 3);
    assert_eq!(harness.orchestrator.documents_indexed(), 3);

    let experiment = harness.provider.indexed_document("experiment.1").unwrap();
    assert_eq!(experiment.text(), "Neutron Study desc ANSTO BL-4 Alice Bob");
    assert_eq!(
        experiment.get("experiment_beamline"),
        Some(&FieldValue::Text("BL-4".to_string()))
    );

    let dataset = harness.provider.indexed_document("dataset.2").unwrap();
    assert_eq!(dataset.text(), "Beamtime run");

    let datafile = harness.provider.indexed_document("datafile.3").unwrap();
    assert_eq!(datafile.text(), "scan_001.nxs");
    assert_eq!(datafile.get("datafile_energy"), Some(&FieldValue::Number(12.5)));
}

#[tokio::test]
async fn test_orchestrator_extends_mappings_with_parameter_fields() {
    let mut harness = create_test_orchestrator(
        populated_store(),
        MockConsumer::new(Vec::new()),
        FailurePolicy::Skip,
    )
    .await;

    let result = timeout(Duration::from_secs(5), harness.orchestrator.run()).await;
    assert!(result.unwrap().is_ok());

    let datafile = harness
        .provider
        .ensured_schema(EntityKind::Datafile)
        .unwrap();
    assert!(datafile.parameters.contains("datafile_energy"));

    let experiment = harness
        .provider
        .ensured_schema(EntityKind::Experiment)
        .unwrap();
    assert!(experiment.parameters.contains("experiment_beamline"));
    assert!(!experiment.parameters.contains("datafile_energy"));
}

#[tokio::test]
async fn test_orchestrator_with_delete_events() {
    let events = vec![
        EntityEvent::delete(EntityKind::Dataset, 2),
        EntityEvent::delete(EntityKind::Datafile, 9),
    ];
    let mut harness = create_test_orchestrator(
        populated_store(),
        MockConsumer::new(events),
        FailurePolicy::Skip,
    )
    .await;

    let result = timeout(Duration::from_secs(5), harness.orchestrator.run()).await;
    assert!(result.unwrap().is_ok());

    assert_eq!(
        harness.provider.deleted_ids(),
        vec!["dataset.2".to_string(), "datafile.9".to_string()]
    );
    assert!(harness.provider.indexed().is_empty());
}

#[tokio::test]
async fn test_upsert_then_delete_in_one_batch_only_deletes() {
    let events = vec![
        EntityEvent::upsert(EntityKind::Datafile, 3),
        EntityEvent::delete(EntityKind::Datafile, 3),
    ];
    let mut harness = create_test_orchestrator(
        populated_store(),
        MockConsumer::new(events),
        FailurePolicy::Skip,
    )
    .await;

    let result = timeout(Duration::from_secs(5), harness.orchestrator.run()).await;
    assert!(result.unwrap().is_ok());

    assert!(harness.provider.indexed().is_empty());
    assert_eq!(harness.provider.deleted_ids(), vec!["datafile.3".to_string()]);
}

#[tokio::test]
async fn test_upsert_of_removed_entity_is_skipped() {
    let store = populated_store();
    store.remove(EntityKind::Datafile, 3);

    let mut harness = create_test_orchestrator(
        store,
        MockConsumer::new(vec![EntityEvent::upsert(EntityKind::Datafile, 3)]),
        FailurePolicy::Abort,
    )
    .await;

    let result = timeout(Duration::from_secs(5), harness.orchestrator.run()).await;
    assert!(result.unwrap().is_ok());

    assert_eq!(harness.consumer.acknowledgments(), vec![true]);
    assert!(harness.provider.indexed().is_empty());
}

#[tokio::test]
async fn test_orchestrator_configuration() {
    let store = populated_store();
    let consumer = Arc::new(MockConsumer::new(Vec::new()));
    let provider = Arc::new(MockSearchProvider::new());

    let schemas = Arc::new(SchemaRegistry::load(ParameterCatalog::new(store.clone())).await);
    let config = OrchestratorConfig {
        channel_buffer_size: 500,
        schema_refresh_interval: Some(Duration::from_secs(60)),
        reindex_batch_size: 10,
    };

    let mut orchestrator = Orchestrator::with_config(
        consumer,
        EntityProcessor::new(AssemblerRegistry::new(store)),
        SearchLoader::new(provider),
        schemas,
        config,
    );

    let result = timeout(Duration::from_secs(5), orchestrator.run()).await;
    assert!(result.is_ok(), "Orchestrator should complete within timeout");
    assert!(result.unwrap().is_ok());
}

#[tokio::test]
async fn test_empty_event_batch_processing() {
    let mut harness = create_test_orchestrator(
        populated_store(),
        MockConsumer::new(Vec::new()),
        FailurePolicy::Skip,
    )
    .await;

    let result = timeout(Duration::from_secs(5), harness.orchestrator.run()).await;
    assert!(result.unwrap().is_ok());

    assert_eq!(harness.consumer.acknowledgments(), vec![true]);
    assert!(harness.provider.indexed().is_empty());
}

#[tokio::test]
async fn test_orchestrator_shutdown() {
    let mut harness = create_test_orchestrator(
        populated_store(),
        MockConsumer::idle(),
        FailurePolicy::Skip,
    )
    .await;

    let shutdown = harness.orchestrator.shutdown_handle();
    let shutdown_handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = shutdown.send(());
    });

    let result = timeout(Duration::from_secs(5), harness.orchestrator.run()).await;
    assert!(shutdown_handle.await.is_ok(), "Shutdown task should succeed");
    assert!(result.is_ok(), "Orchestrator should stop after shutdown");
    assert!(result.unwrap().is_ok());
}

#[tokio::test]
async fn test_orchestrator_error_handling() {
    let mut harness = create_test_orchestrator(
        populated_store(),
        MockConsumer::with_subscribe_error(vec![EntityEvent::upsert(EntityKind::Datafile, 3)]),
        FailurePolicy::Skip,
    )
    .await;

    let result = timeout(Duration::from_secs(5), harness.orchestrator.run()).await;
    assert!(result.is_ok(), "Orchestrator should complete");

    match result.unwrap().unwrap_err() {
        IngestError::KafkaError(msg) => assert_eq!(msg, "Mock subscribe error"),
        other => panic!("Expected KafkaError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_abort_policy_sends_nack() {
    let store = populated_store();
    // Datafile whose dataset does not exist.
    store.insert_datafile(DatafileRecord {
        id: 8,
        dataset_id: 80,
        filename: "orphan.h5".to_string(),
    });

    let events = vec![
        EntityEvent::upsert(EntityKind::Datafile, 3),
        EntityEvent::upsert(EntityKind::Datafile, 8),
    ];
    let mut harness =
        create_test_orchestrator(store, MockConsumer::new(events), FailurePolicy::Abort).await;

    let result = timeout(Duration::from_secs(5), harness.orchestrator.run()).await;
    assert!(matches!(
        result.unwrap(),
        Err(IngestError::BatchRejected(_))
    ));

    assert_eq!(harness.consumer.acknowledgments(), vec![false]);
    assert!(harness.provider.indexed().is_empty());
}

#[tokio::test]
async fn test_rejected_document_nacks_the_batch() {
    let events = vec![
        EntityEvent::upsert(EntityKind::Experiment, 1),
        EntityEvent::upsert(EntityKind::Datafile, 3),
    ];
    let mut harness = create_harness(
        populated_store(),
        MockConsumer::new(events),
        MockSearchProvider::rejecting("datafile.3"),
        FailurePolicy::Skip,
    )
    .await;

    let result = timeout(Duration::from_secs(5), harness.orchestrator.run()).await;
    match result.unwrap() {
        Err(IngestError::BatchRejected(msg)) => assert!(msg.contains("1 of 2")),
        other => panic!("Expected BatchRejected, got {:?}", other),
    }

    assert_eq!(harness.consumer.acknowledgments(), vec![false]);
    assert_eq!(harness.orchestrator.documents_indexed(), 1);
    assert!(harness.provider.indexed_document("experiment.1").is_some());
    assert!(harness.provider.indexed_document("datafile.3").is_none());
}

#[tokio::test]
async fn test_skip_policy_indexes_the_rest_of_the_batch() {
    let store = populated_store();
    store.insert_datafile(DatafileRecord {
        id: 8,
        dataset_id: 80,
        filename: "orphan.h5".to_string(),
    });

    let events = vec![
        EntityEvent::upsert(EntityKind::Datafile, 8),
        EntityEvent::upsert(EntityKind::Datafile, 3),
    ];
    let mut harness =
        create_test_orchestrator(store, MockConsumer::new(events), FailurePolicy::Skip).await;

    let result = timeout(Duration::from_secs(5), harness.orchestrator.run()).await;
    assert!(result.unwrap().is_ok());

    assert_eq!(harness.consumer.acknowledgments(), vec![true]);
    let indexed: Vec<String> = harness
        .provider
        .indexed()
        .iter()
        .map(Document::document_id)
        .collect();
    assert_eq!(indexed, vec!["datafile.3".to_string()]);
}

#[tokio::test]
async fn test_reindex_all_indexes_every_entity() {
    let store = populated_store();
    let mut harness = create_test_orchestrator(
        store.clone(),
        MockConsumer::new(Vec::new()),
        FailurePolicy::Skip,
    )
    .await;

    let indexed = harness
        .orchestrator
        .reindex_all(store.as_ref())
        .await
        .unwrap();

    assert_eq!(indexed, 3);
    let mut ids: Vec<String> = harness
        .provider
        .indexed()
        .iter()
        .map(Document::document_id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["datafile.3", "dataset.2", "experiment.1"]);
}

#[tokio::test]
async fn test_unavailable_store_falls_back_to_fixed_fields() {
    let store = populated_store();
    store.set_unavailable(true);

    let mut harness = create_test_orchestrator(
        store,
        MockConsumer::new(vec![EntityEvent::upsert(EntityKind::Datafile, 3)]),
        FailurePolicy::Skip,
    )
    .await;

    let result = timeout(Duration::from_secs(5), harness.orchestrator.run()).await;
    assert!(result.unwrap().is_ok());

    for kind in EntityKind::ALL {
        let schema = harness.provider.ensured_schema(kind).unwrap();
        assert_eq!(schema, IndexSchema::without_parameters(kind));
    }
    assert_eq!(harness.consumer.acknowledgments(), vec![true]);
    assert!(harness.provider.indexed().is_empty());
}
