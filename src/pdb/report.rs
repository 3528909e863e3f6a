use std::time::Duration;

use chrono::{NaiveDate, Utc};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::json;

use crate::pdb::models::PdbInfo;
use crate::pdb::PdbError;
use crate::records;

/// Columns requested from the custom report, in response order.
pub const REPORT_COLUMNS: [&str; 11] = [
    "structureId",
    "chainId",
    "structureTitle",
    "experimentalTechnique",
    "releaseDate",
    "resolution",
    "macromoleculeType",
    "entityId",
    "sequence",
    "chainLength",
    "source",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportRow {
    structure_id: String,
    chain_id: String,
    structure_title: Option<String>,
    experimental_technique: Option<String>,
    release_date: Option<String>,
    resolution: Option<f64>,
    macromolecule_type: Option<String>,
    entity_id: Option<i32>,
    sequence: Option<String>,
    chain_length: Option<i32>,
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result_set: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    identifier: String,
}

/// Where structure metadata comes from.
pub trait StructureSource {
    /// Ids of every entry with at least one RNA polymer entity.
    fn rna_structures(&self) -> Result<Vec<String>, PdbError>;
    /// The custom report CSV for `pdb_ids`.
    fn report(&self, pdb_ids: &[String]) -> Result<String, PdbError>;
    /// The obsolete-entries status file.
    fn obsolete_file(&self) -> Result<String, PdbError>;
}

pub struct RcsbHttpClient {
    client: Client,
    search_url: String,
    report_url: String,
    obsolete_url: String,
}

impl RcsbHttpClient {
    pub fn new(search_url: &str, report_url: &str, obsolete_url: &str) -> Result<Self, PdbError> {
        let client = Client::builder()
            .user_agent(format!("motif-atlas/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            search_url: search_url.to_string(),
            report_url: report_url.to_string(),
            obsolete_url: obsolete_url.to_string(),
        })
    }

    fn handle_status(url: &str, response: Response) -> Result<Response, PdbError> {
        if response.status().is_success() {
            return Ok(response);
        }
        Err(PdbError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        })
    }
}

impl StructureSource for RcsbHttpClient {
    fn rna_structures(&self) -> Result<Vec<String>, PdbError> {
        let response = self.client.post(&self.search_url).json(&rna_query()).send()?;
        let body = Self::handle_status(&self.search_url, response)?.text()?;
        parse_search_response(&body)
    }

    fn report(&self, pdb_ids: &[String]) -> Result<String, PdbError> {
        let url = report_url(&self.report_url, pdb_ids);
        let response = self.client.get(&url).send()?;
        Ok(Self::handle_status(&url, response)?.text()?)
    }

    fn obsolete_file(&self) -> Result<String, PdbError> {
        let response = self.client.get(&self.obsolete_url).send()?;
        Ok(Self::handle_status(&self.obsolete_url, response)?.text()?)
    }
}

pub fn rna_query() -> serde_json::Value {
    json!({
        "query": {
            "type": "terminal",
            "service": "text",
            "parameters": {
                "attribute": "rcsb_entry_info.polymer_entity_count_RNA",
                "operator": "greater",
                "value": 0
            }
        },
        "return_type": "entry",
        "request_options": { "return_all_hits": true }
    })
}

pub fn parse_search_response(body: &str) -> Result<Vec<String>, PdbError> {
    let response: SearchResponse = serde_json::from_str(body)?;
    let mut ids: Vec<String> = response
        .result_set
        .into_iter()
        .map(|hit| hit.identifier.to_uppercase())
        .collect();
    ids.sort();
    ids.dedup();
    Ok(ids)
}

pub fn report_url(base: &str, pdb_ids: &[String]) -> String {
    format!(
        "{}?pdbids={}&customReportColumns={}&service=wsfile&format=csv",
        base,
        pdb_ids.join(","),
        REPORT_COLUMNS[2..].join(",")
    )
}

pub fn parse_report(body: &str) -> Result<Vec<PdbInfo>, PdbError> {
    let rows: Vec<ReportRow> = records::read_records(body.as_bytes(), &REPORT_COLUMNS)?;
    let now = Utc::now().naive_utc();

    rows.into_iter()
        .map(|row| -> Result<PdbInfo, PdbError> {
            let release_date = match row.release_date.as_deref() {
                Some(raw) if !raw.is_empty() => Some(
                    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                        .map_err(|_| PdbError::Date(raw.to_string()))?,
                ),
                _ => None,
            };
            Ok(PdbInfo {
                structure_id: row.structure_id.to_uppercase(),
                chain_id: row.chain_id,
                title: row.structure_title,
                experimental_technique: row.experimental_technique,
                release_date,
                resolution: row.resolution,
                macromolecule_type: row.macromolecule_type,
                entity_id: row.entity_id,
                sequence: row.sequence,
                chain_length: row.chain_length,
                source: row.source,
                updated_at: now,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
structureId,chainId,structureTitle,experimentalTechnique,releaseDate,resolution,macromoleculeType,entityId,sequence,chainLength,source
1s72,0,\"Large ribosomal subunit\",X-RAY DIFFRACTION,2004-04-13,2.4,RNA,1,UUAGGCG,2922,Haloarcula marismortui
1s72,1,\"Large ribosomal subunit\",X-RAY DIFFRACTION,2004-04-13,2.4,RNA,2,UUAGGC,122,Haloarcula marismortui
2n2o,A,\"NMR structure\",SOLUTION NMR,,,Polypeptide(L),1,MKV,3,
";

    #[test]
    fn parses_report_rows() {
        let rows = parse_report(REPORT).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].structure_id, "1S72");
        assert_eq!(rows[0].release_date, NaiveDate::from_ymd_opt(2004, 4, 13));
        assert_eq!(rows[0].chain_length, Some(2922));
        assert!(rows[0].is_rna());

        assert_eq!(rows[2].resolution, None);
        assert_eq!(rows[2].release_date, None);
        assert!(!rows[2].is_rna());
    }

    #[test]
    fn rejects_reports_with_other_columns() {
        let body = "structureId,chainId\n1S72,0\n";
        assert!(matches!(parse_report(body), Err(PdbError::Records(_))));
    }

    #[test]
    fn rejects_bad_dates() {
        let body = REPORT.replace("2004-04-13", "13/04/2004");
        assert!(matches!(parse_report(&body), Err(PdbError::Date(_))));
    }

    #[test]
    fn builds_report_url() {
        let url = report_url("https://example.org/customReport.csv", &["1S72".to_string(), "2AW7".to_string()]);
        assert!(url.starts_with("https://example.org/customReport.csv?pdbids=1S72,2AW7&customReportColumns=structureTitle,"));
        assert!(url.ends_with("&service=wsfile&format=csv"));
    }

    #[test]
    fn parses_search_hits() {
        let body = r#"{"query_id":"x","result_type":"entry","total_count":3,
            "result_set":[{"identifier":"2AW7","score":1.0},{"identifier":"1s72","score":1.0},{"identifier":"2AW7","score":1.0}]}"#;
        assert_eq!(parse_search_response(body).unwrap(), ["1S72", "2AW7"]);
    }

    #[test]
    fn empty_search_has_no_hits() {
        assert!(parse_search_response("{}").unwrap().is_empty());
    }
}
