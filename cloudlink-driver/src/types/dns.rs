use serde::{Deserialize, Serialize};

use super::Extra;

/// Whether the provider is authoritative for the zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneType {
    Master,
    Slave,
}

/// A DNS zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: String,
    /// Zone apex, without trailing dot (e.g. `"example.com"`).
    pub domain: String,
    pub zone_type: ZoneType,
    /// Default TTL, when the provider exposes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    pub provider: String,
    pub extra: Extra,
}

/// DNS record type.
///
/// Serialized as uppercase strings (`"A"`, `"AAAA"`, `"CNAME"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Txt,
    Ns,
    Srv,
    Caa,
    Ptr,
    Spf,
}

impl RecordType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Cname => "CNAME",
            Self::Mx => "MX",
            Self::Txt => "TXT",
            Self::Ns => "NS",
            Self::Srv => "SRV",
            Self::Caa => "CAA",
            Self::Ptr => "PTR",
            Self::Spf => "SPF",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::Aaaa),
            "CNAME" => Ok(Self::Cname),
            "MX" => Ok(Self::Mx),
            "TXT" => Ok(Self::Txt),
            "NS" => Ok(Self::Ns),
            "SRV" => Ok(Self::Srv),
            "CAA" => Ok(Self::Caa),
            "PTR" => Ok(Self::Ptr),
            "SPF" => Ok(Self::Spf),
            other => Err(other.to_string()),
        }
    }
}

/// A DNS record.
///
/// `data` holds the record value in presentation form (`"1.2.3.4"`,
/// `"mail.example.com"`, `"0 issue \"letsencrypt.org\""`). Structured
/// components such as MX/SRV priority are also copied into `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    /// Relative name (`"www"`), or `"@"` for the apex.
    pub name: String,
    pub record_type: RecordType,
    pub data: String,
    pub zone_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    pub provider: String,
    pub extra: Extra,
}

/// Parameters for [`DnsDriver::create_zone`](crate::DnsDriver::create_zone).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateZoneRequest {
    pub domain: String,
    pub zone_type: ZoneType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default)]
    pub ex: Extra,
}

/// Parameters for [`DnsDriver::create_record`](crate::DnsDriver::create_record).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    pub zone_id: String,
    /// Relative name, `"@"` for the apex.
    pub name: String,
    pub record_type: RecordType,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    /// Provider-specific options such as `priority` or `proxied`.
    #[serde(default)]
    pub ex: Extra,
}

/// Parameters for [`DnsDriver::update_record`](crate::DnsDriver::update_record).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecordRequest {
    pub zone_id: String,
    pub name: String,
    pub record_type: RecordType,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default)]
    pub ex: Extra,
}

/// Outcome of a batch operation: the successful results plus per-item failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult<T> {
    pub succeeded: Vec<T>,
    pub failures: Vec<BatchFailure>,
}

impl<T> BatchResult<T> {
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }
}

/// A single failed item of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    /// Index of the item in the input slice.
    pub index: usize,
    /// Name or id of the item, for display.
    pub item: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_type_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&RecordType::Aaaa).unwrap(), "\"AAAA\"");
        let back: RecordType = serde_json::from_str("\"CNAME\"").unwrap();
        assert_eq!(back, RecordType::Cname);
    }

    #[test]
    fn record_type_from_str_is_case_insensitive() {
        assert_eq!("mx".parse::<RecordType>(), Ok(RecordType::Mx));
        assert_eq!("Srv".parse::<RecordType>(), Ok(RecordType::Srv));
        assert_eq!("LOC".parse::<RecordType>(), Err("LOC".to_string()));
    }

    #[test]
    fn batch_counts() {
        let r: BatchResult<u32> = BatchResult {
            succeeded: vec![1, 2],
            failures: vec![BatchFailure {
                index: 2,
                item: "www".into(),
                reason: "boom".into(),
            }],
        };
        assert_eq!(r.success_count(), 2);
        assert_eq!(r.failed_count(), 1);
    }
}
