//! Cloudflare `DnsDriver` implementation

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};

use crate::drivers::common::{full_name_to_relative, parse_flag, relative_to_full_name};
use crate::error::{DriverError, ResourceKind, Result};
use crate::pagination::collect_pages;
use crate::traits::{DnsDriver, ErrorContext, ErrorMapper};
use crate::types::{
    AuthScheme, CreateRecordRequest, CreateZoneRequest, CredentialField, DriverKind,
    DriverMetadata, Extra, Record, RecordType, UpdateRecordRequest, Zone, ZoneType, extra_from,
};

use super::types::{
    AccountRef, CloudflareDnsRecord, CloudflareZone, CreateZoneBody, RecordBody, TokenStatus,
};
use super::{CloudflareDnsDriver, MAX_PAGE_SIZE_RECORDS, MAX_PAGE_SIZE_ZONES, PROVIDER};

/// TTL value meaning "automatic".
const AUTO_TTL: u32 = 1;

fn zone_path(zone_id: &str) -> String {
    format!("/zones/{}", urlencoding::encode(zone_id))
}

fn record_path(zone_id: &str, record_id: &str) -> String {
    format!(
        "{}/dns_records/{}",
        zone_path(zone_id),
        urlencoding::encode(record_id)
    )
}

impl CloudflareDnsDriver {
    /// Convert a Cloudflare zone.
    /// Cloudflare zone types: full, partial, secondary
    pub(crate) fn convert_zone(zone: CloudflareZone) -> Zone {
        let zone_type = match zone.zone_type.as_deref() {
            Some("secondary") => ZoneType::Slave,
            _ => ZoneType::Master,
        };

        Zone {
            extra: extra_from([
                ("status", json!(zone.status)),
                ("type", json!(zone.zone_type)),
                ("paused", json!(zone.paused)),
                ("name_servers", json!(zone.name_servers)),
                ("created_on", json!(zone.created_on)),
            ]),
            id: zone.id,
            domain: zone.name,
            zone_type,
            ttl: None,
            provider: PROVIDER.to_string(),
        }
    }

    /// Convert a Cloudflare record. Returns `None` for record types outside [`RecordType`].
    pub(crate) fn convert_record(
        cf_record: CloudflareDnsRecord,
        zone_id: &str,
        zone_name: &str,
    ) -> Option<Record> {
        let Ok(record_type) = cf_record.record_type.parse::<RecordType>() else {
            log::debug!(
                "[{PROVIDER}] Skipping unsupported record type {}",
                cf_record.record_type
            );
            return None;
        };

        Some(Record {
            id: cf_record.id,
            name: full_name_to_relative(&cf_record.name, zone_name),
            record_type,
            data: cf_record.content,
            zone_id: zone_id.to_string(),
            ttl: (cf_record.ttl != AUTO_TTL).then_some(cf_record.ttl),
            provider: PROVIDER.to_string(),
            extra: extra_from([
                ("priority", json!(cf_record.priority)),
                ("proxied", json!(cf_record.proxied)),
                ("data", cf_record.data.unwrap_or(Value::Null)),
                ("created_on", json!(cf_record.created_on)),
                ("modified_on", json!(cf_record.modified_on)),
                ("fqdn", json!(cf_record.name)),
            ]),
        })
    }

    fn record_body(
        record_type: RecordType,
        name: &str,
        data: &str,
        ttl: Option<u32>,
        ex: &Extra,
        zone_name: &str,
    ) -> RecordBody {
        let structured = ex.get("data").filter(|v| v.is_object()).cloned();
        RecordBody {
            record_type: record_type.as_str().to_string(),
            name: relative_to_full_name(name, zone_name),
            content: (structured.is_none() || !data.is_empty()).then(|| data.to_string()),
            ttl: ttl.unwrap_or(AUTO_TTL),
            priority: ex
                .get("priority")
                .and_then(Value::as_u64)
                .and_then(|p| u16::try_from(p).ok()),
            proxied: ex.get("proxied").and_then(|v| match v {
                Value::Bool(b) => Some(*b),
                Value::String(s) => parse_flag(Some(s)),
                _ => None,
            }),
            data: structured,
        }
    }

    async fn zone_name(&self, zone_id: &str) -> Result<String> {
        let zone: CloudflareZone = self
            .request::<_, ()>(
                Method::GET,
                &zone_path(zone_id),
                None,
                ErrorContext::with_id(ResourceKind::Zone, zone_id),
            )
            .await?;
        Ok(zone.name)
    }
}

#[async_trait]
impl DnsDriver for CloudflareDnsDriver {
    fn id(&self) -> &'static str {
        PROVIDER
    }

    fn metadata() -> DriverMetadata {
        DriverMetadata {
            id: PROVIDER.to_string(),
            name: "Cloudflare".to_string(),
            kind: DriverKind::Dns,
            auth: AuthScheme::ApiToken,
            required_fields: vec![
                CredentialField::secret("apiToken", "API Token")
                    .help("Token with Zone:Read and DNS:Edit permissions"),
            ],
            website: Some("https://www.cloudflare.com".to_string()),
        }
    }

    async fn validate_credentials(&self) -> Result<bool> {
        match self
            .request::<TokenStatus, ()>(
                Method::GET,
                "/user/tokens/verify",
                None,
                ErrorContext::default(),
            )
            .await
        {
            Ok(resp) => Ok(resp.status == "active"),
            Err(DriverError::InvalidCredentials { .. } | DriverError::PermissionDenied { .. }) => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn list_zones(&self) -> Result<Vec<Zone>> {
        let zones: Vec<CloudflareZone> = collect_pages(PROVIDER, 1, |page| {
            self.get_page("/zones", page, MAX_PAGE_SIZE_ZONES, ErrorContext::default())
        })
        .await?;
        Ok(zones.into_iter().map(Self::convert_zone).collect())
    }

    async fn get_zone(&self, zone_id: &str) -> Result<Zone> {
        let zone: CloudflareZone = self
            .request::<_, ()>(
                Method::GET,
                &zone_path(zone_id),
                None,
                ErrorContext::with_id(ResourceKind::Zone, zone_id),
            )
            .await?;
        Ok(Self::convert_zone(zone))
    }

    async fn create_zone(&self, req: &CreateZoneRequest) -> Result<Zone> {
        let account_id = req
            .ex
            .get("account_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| self.account_id.clone());

        let body = CreateZoneBody {
            name: req.domain.trim_end_matches('.').to_string(),
            zone_type: match req.zone_type {
                ZoneType::Master => "full",
                ZoneType::Slave => "secondary",
            },
            account: account_id.map(|id| AccountRef { id }),
        };

        let zone: CloudflareZone = self
            .request(
                Method::POST,
                "/zones",
                Some(&body),
                ErrorContext::with_name(ResourceKind::Zone, &req.domain),
            )
            .await?;
        Ok(Self::convert_zone(zone))
    }

    async fn delete_zone(&self, zone_id: &str) -> Result<()> {
        let _: Value = self
            .request::<_, ()>(
                Method::DELETE,
                &zone_path(zone_id),
                None,
                ErrorContext::with_id(ResourceKind::Zone, zone_id),
            )
            .await?;
        Ok(())
    }

    async fn list_records(&self, zone_id: &str) -> Result<Vec<Record>> {
        let zone_name = self.zone_name(zone_id).await?;
        let path = format!("{}/dns_records", zone_path(zone_id));

        let cf_records: Vec<CloudflareDnsRecord> = collect_pages(PROVIDER, 1, |page| {
            self.get_page(
                &path,
                page,
                MAX_PAGE_SIZE_RECORDS,
                ErrorContext::with_id(ResourceKind::Zone, zone_id),
            )
        })
        .await?;

        Ok(cf_records
            .into_iter()
            .filter_map(|r| Self::convert_record(r, zone_id, &zone_name))
            .collect())
    }

    async fn get_record(&self, zone_id: &str, record_id: &str) -> Result<Record> {
        let zone_name = self.zone_name(zone_id).await?;
        let cf_record: CloudflareDnsRecord = self
            .request::<_, ()>(
                Method::GET,
                &record_path(zone_id, record_id),
                None,
                ErrorContext::with_id(ResourceKind::Record, record_id),
            )
            .await?;

        Self::convert_record(cf_record, zone_id, &zone_name)
            .ok_or_else(|| self.parse_error("Unsupported record type"))
    }

    async fn create_record(&self, req: &CreateRecordRequest) -> Result<Record> {
        let zone_name = self.zone_name(&req.zone_id).await?;
        let body = Self::record_body(
            req.record_type,
            &req.name,
            &req.data,
            req.ttl,
            &req.ex,
            &zone_name,
        );

        let cf_record: CloudflareDnsRecord = self
            .request(
                Method::POST,
                &format!("{}/dns_records", zone_path(&req.zone_id)),
                Some(&body),
                ErrorContext::with_name(ResourceKind::Record, &req.name),
            )
            .await?;

        Self::convert_record(cf_record, &req.zone_id, &zone_name)
            .ok_or_else(|| self.parse_error("Unsupported record type"))
    }

    async fn update_record(&self, record_id: &str, req: &UpdateRecordRequest) -> Result<Record> {
        let zone_name = self.zone_name(&req.zone_id).await?;
        let body = Self::record_body(
            req.record_type,
            &req.name,
            &req.data,
            req.ttl,
            &req.ex,
            &zone_name,
        );

        let cf_record: CloudflareDnsRecord = self
            .request(
                Method::PATCH,
                &record_path(&req.zone_id, record_id),
                Some(&body),
                ErrorContext {
                    resource: Some(ResourceKind::Record),
                    id: Some(record_id.to_string()),
                    name: Some(req.name.clone()),
                },
            )
            .await?;

        Self::convert_record(cf_record, &req.zone_id, &zone_name)
            .ok_or_else(|| self.parse_error("Unsupported record type"))
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        let _: Value = self
            .request::<_, ()>(
                Method::DELETE,
                &record_path(zone_id, record_id),
                None,
                ErrorContext::with_id(ResourceKind::Record, record_id),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cf_record(record_type: &str, name: &str, ttl: u32) -> CloudflareDnsRecord {
        serde_json::from_value(json!({
            "id": "rec-1",
            "type": record_type,
            "name": name,
            "content": "mail.example.com",
            "ttl": ttl,
            "priority": 10,
            "proxied": false
        }))
        .unwrap()
    }

    #[test]
    fn ids_are_escaped_in_paths() {
        assert_eq!(zone_path("zone-1"), "/zones/zone-1");
        assert_eq!(zone_path("a/../b"), "/zones/a%2F..%2Fb");
        assert_eq!(
            record_path("zone 1", "rec?id=2"),
            "/zones/zone%201/dns_records/rec%3Fid%3D2"
        );
    }

    #[test]
    fn convert_record_relative_name_and_extra() {
        let r = CloudflareDnsDriver::convert_record(
            cf_record("MX", "example.com", 3600),
            "z1",
            "example.com",
        )
        .unwrap();
        assert_eq!(r.name, "@");
        assert_eq!(r.record_type, RecordType::Mx);
        assert_eq!(r.ttl, Some(3600));
        assert_eq!(r.extra.get("priority"), Some(&json!(10)));
        assert_eq!(r.extra.get("fqdn"), Some(&json!("example.com")));
        assert!(!r.extra.contains_key("data"));
    }

    #[test]
    fn convert_record_auto_ttl_is_none() {
        let r = CloudflareDnsDriver::convert_record(
            cf_record("CNAME", "www.example.com", 1),
            "z1",
            "example.com",
        )
        .unwrap();
        assert_eq!(r.name, "www");
        assert_eq!(r.ttl, None);
    }

    #[test]
    fn convert_record_skips_unknown_type() {
        let r = CloudflareDnsDriver::convert_record(
            cf_record("LOC", "x.example.com", 1),
            "z1",
            "example.com",
        );
        assert!(r.is_none());
    }

    #[test]
    fn convert_zone_types() {
        let zone: CloudflareZone = serde_json::from_value(json!({
            "id": "z1",
            "name": "example.com",
            "status": "active",
            "type": "secondary",
            "name_servers": ["a.ns.cloudflare.com"]
        }))
        .unwrap();
        let z = CloudflareDnsDriver::convert_zone(zone);
        assert_eq!(z.zone_type, ZoneType::Slave);
        assert_eq!(z.extra.get("status"), Some(&json!("active")));
        assert!(!z.extra.contains_key("paused"));
    }

    #[test]
    fn record_body_reads_ex_options() {
        let mut ex = Extra::new();
        ex.insert("priority".into(), json!(20));
        ex.insert("proxied".into(), json!("true"));
        let body = CloudflareDnsDriver::record_body(
            RecordType::Mx,
            "@",
            "mx.example.com",
            None,
            &ex,
            "example.com.",
        );
        assert_eq!(body.name, "example.com");
        assert_eq!(body.ttl, AUTO_TTL);
        assert_eq!(body.priority, Some(20));
        assert_eq!(body.proxied, Some(true));
        assert_eq!(body.content.as_deref(), Some("mx.example.com"));
    }

    #[test]
    fn record_body_structured_data() {
        let mut ex = Extra::new();
        ex.insert(
            "data".into(),
            json!({"flags": 0, "tag": "issue", "value": "letsencrypt.org"}),
        );
        let body = CloudflareDnsDriver::record_body(
            RecordType::Caa,
            "@",
            "",
            Some(300),
            &ex,
            "example.com",
        );
        assert!(body.content.is_none());
        assert!(body.data.is_some());
        assert_eq!(body.ttl, 300);
    }

    #[test]
    fn metadata_requires_token() {
        let meta = CloudflareDnsDriver::metadata();
        assert_eq!(meta.id, "cloudflare");
        assert_eq!(meta.required_fields[0].key, "apiToken");
    }
}
