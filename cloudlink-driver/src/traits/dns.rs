use async_trait::async_trait;

use crate::error::{DriverError, ResourceKind, Result};
use crate::types::{
    BatchFailure, BatchResult, CreateRecordRequest, CreateZoneRequest, DriverMetadata, Record,
    UpdateRecordRequest, Zone,
};

/// DNS driver contract.
#[async_trait]
pub trait DnsDriver: Send + Sync {
    /// Registry id of the provider.
    fn id(&self) -> &'static str;

    fn metadata() -> DriverMetadata
    where
        Self: Sized;

    /// Check the credentials with a cheap authenticated call.
    ///
    /// Returns `Ok(false)` when the provider rejects them; other failures are errors.
    async fn validate_credentials(&self) -> Result<bool>;

    /// All zones of the account, every page included.
    async fn list_zones(&self) -> Result<Vec<Zone>>;

    /// Default: scan [`list_zones`](Self::list_zones).
    async fn get_zone(&self, zone_id: &str) -> Result<Zone> {
        self.list_zones()
            .await?
            .into_iter()
            .find(|z| z.id == zone_id)
            .ok_or_else(|| DriverError::not_found(self.id(), ResourceKind::Zone, zone_id))
    }

    async fn create_zone(&self, req: &CreateZoneRequest) -> Result<Zone> {
        let _ = req;
        Err(DriverError::not_supported(self.id(), "create_zone"))
    }

    async fn delete_zone(&self, zone_id: &str) -> Result<()> {
        let _ = zone_id;
        Err(DriverError::not_supported(self.id(), "delete_zone"))
    }

    /// All records of a zone, every page included.
    async fn list_records(&self, zone_id: &str) -> Result<Vec<Record>>;

    /// Default: scan [`list_records`](Self::list_records).
    async fn get_record(&self, zone_id: &str, record_id: &str) -> Result<Record> {
        self.list_records(zone_id)
            .await?
            .into_iter()
            .find(|r| r.id == record_id)
            .ok_or_else(|| DriverError::not_found(self.id(), ResourceKind::Record, record_id))
    }

    async fn create_record(&self, req: &CreateRecordRequest) -> Result<Record> {
        let _ = req;
        Err(DriverError::not_supported(self.id(), "create_record"))
    }

    async fn update_record(&self, record_id: &str, req: &UpdateRecordRequest) -> Result<Record> {
        let _ = (record_id, req);
        Err(DriverError::not_supported(self.id(), "update_record"))
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        let _ = (zone_id, record_id);
        Err(DriverError::not_supported(self.id(), "delete_record"))
    }

    /// Create several records.
    ///
    /// The default issues every `create_record` concurrently and collects
    /// per-item failures. Drivers can override it with a native batch API.
    async fn batch_create_records(
        &self,
        requests: &[CreateRecordRequest],
    ) -> Result<BatchResult<Record>> {
        let futures: Vec<_> = requests.iter().map(|req| self.create_record(req)).collect();
        let results = futures::future::join_all(futures).await;

        let mut succeeded = Vec::new();
        let mut failures = Vec::new();

        for (i, result) in results.into_iter().enumerate() {
            match result {
                Ok(record) => succeeded.push(record),
                Err(e) => failures.push(BatchFailure {
                    index: i,
                    item: requests[i].name.clone(),
                    reason: e.to_string(),
                }),
            }
        }

        Ok(BatchResult {
            succeeded,
            failures,
        })
    }

    /// Delete several records of one zone. `succeeded` lists the deleted ids.
    async fn batch_delete_records(
        &self,
        zone_id: &str,
        record_ids: &[String],
    ) -> Result<BatchResult<String>> {
        let futures: Vec<_> = record_ids
            .iter()
            .map(|id| self.delete_record(zone_id, id))
            .collect();
        let results = futures::future::join_all(futures).await;

        let mut succeeded = Vec::new();
        let mut failures = Vec::new();

        for (i, result) in results.into_iter().enumerate() {
            match result {
                Ok(()) => succeeded.push(record_ids[i].clone()),
                Err(e) => failures.push(BatchFailure {
                    index: i,
                    item: record_ids[i].clone(),
                    reason: e.to_string(),
                }),
            }
        }

        Ok(BatchResult {
            succeeded,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuthScheme, DriverKind, Extra, RecordType, ZoneType};

    struct FakeDns;

    fn record(id: &str, name: &str) -> Record {
        Record {
            id: id.into(),
            name: name.into(),
            record_type: RecordType::A,
            data: "192.0.2.1".into(),
            zone_id: "z1".into(),
            ttl: Some(300),
            provider: "fake".into(),
            extra: Extra::new(),
        }
    }

    #[async_trait]
    impl DnsDriver for FakeDns {
        fn id(&self) -> &'static str {
            "fake"
        }

        fn metadata() -> DriverMetadata {
            DriverMetadata {
                id: "fake".into(),
                name: "Fake".into(),
                kind: DriverKind::Dns,
                auth: AuthScheme::ApiToken,
                required_fields: vec![],
                website: None,
            }
        }

        async fn validate_credentials(&self) -> Result<bool> {
            Ok(true)
        }

        async fn list_zones(&self) -> Result<Vec<Zone>> {
            Ok(vec![Zone {
                id: "z1".into(),
                domain: "example.com".into(),
                zone_type: ZoneType::Master,
                ttl: None,
                provider: "fake".into(),
                extra: Extra::new(),
            }])
        }

        async fn list_records(&self, _zone_id: &str) -> Result<Vec<Record>> {
            Ok(vec![record("r1", "www"), record("r2", "api")])
        }

        async fn create_record(&self, req: &CreateRecordRequest) -> Result<Record> {
            if req.name == "bad" {
                return Err(DriverError::InvalidParameter {
                    provider: "fake".into(),
                    param: "name".into(),
                    detail: "rejected".into(),
                });
            }
            Ok(record("new", &req.name))
        }

        async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
            if record_id == "r404" {
                return Err(DriverError::not_found("fake", ResourceKind::Record, record_id));
            }
            assert_eq!(zone_id, "z1");
            Ok(())
        }
    }

    fn create_req(name: &str) -> CreateRecordRequest {
        CreateRecordRequest {
            zone_id: "z1".into(),
            name: name.into(),
            record_type: RecordType::A,
            data: "192.0.2.10".into(),
            ttl: None,
            ex: Extra::new(),
        }
    }

    #[tokio::test]
    async fn batch_create_collects_failures() {
        let reqs = vec![create_req("www"), create_req("bad"), create_req("api")];
        let result = FakeDns.batch_create_records(&reqs).await.unwrap();
        assert_eq!(result.success_count(), 2);
        assert_eq!(result.failed_count(), 1);
        assert_eq!(result.failures[0].index, 1);
        assert_eq!(result.failures[0].item, "bad");
    }

    #[tokio::test]
    async fn batch_delete_reports_ids() {
        let ids = vec!["r1".to_string(), "r404".to_string()];
        let result = FakeDns.batch_delete_records("z1", &ids).await.unwrap();
        assert_eq!(result.succeeded, vec!["r1".to_string()]);
        assert_eq!(result.failures[0].item, "r404");
    }

    #[tokio::test]
    async fn get_defaults_scan_lists() {
        assert_eq!(FakeDns.get_zone("z1").await.unwrap().domain, "example.com");
        assert_eq!(FakeDns.get_record("z1", "r2").await.unwrap().name, "api");
        assert!(matches!(
            FakeDns.get_record("z1", "nope").await,
            Err(DriverError::NotFound {
                resource: ResourceKind::Record,
                ..
            })
        ));
        assert!(matches!(
            FakeDns.delete_zone("z1").await,
            Err(DriverError::NotSupported { .. })
        ));
    }
}
