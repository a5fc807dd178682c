//! Per-cloudlet records and run summary.

use serde::{Serialize, Serializer};

use crate::core::cloudlet::CloudletStatus;
use crate::core::cloudlet_pool::CloudletPool;
use crate::core::failover::FailoverManager;

fn yes_no<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "Yes" } else { "No" })
}

/// Final per-cloudlet report row. Ids of cloudlets that were never bound to a
/// VM are reported as -1.
#[derive(Debug, Clone, Serialize)]
pub struct CloudletRecord {
    #[serde(rename = "CloudletID")]
    pub cloudlet_id: u32,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "DatacenterId")]
    pub datacenter_id: i64,
    #[serde(rename = "VMId")]
    pub vm_id: i64,
    #[serde(rename = "ExecutionTime")]
    pub execution_time: f64,
    #[serde(rename = "WaitTime")]
    pub wait_time: f64,
    #[serde(rename = "StartTime")]
    pub start_time: f64,
    #[serde(rename = "FinishTime")]
    pub finish_time: f64,
    #[serde(rename = "AffectedByFailover", serialize_with = "yes_no")]
    pub affected_by_failover: bool,
}

/// Builds report rows for all cloudlets, ordered by cloudlet id.
///
/// A cloudlet is counted as affected by the failover iff the disaster occurred
/// and the cloudlet (re)started executing strictly after the failure time.
pub fn build_records(pool: &CloudletPool, failover: &FailoverManager) -> Vec<CloudletRecord> {
    let failure_time = failover.failure_time();
    pool.iter()
        .map(|cloudlet| CloudletRecord {
            cloudlet_id: cloudlet.id(),
            status: cloudlet.status().to_string(),
            datacenter_id: cloudlet.datacenter_id().map_or(-1, |id| id as i64),
            vm_id: cloudlet.vm_id().map_or(-1, |id| id as i64),
            execution_time: cloudlet.exec_time(),
            wait_time: cloudlet.wait_time(),
            start_time: cloudlet.start_time(),
            finish_time: cloudlet.finish_time(),
            affected_by_failover: failure_time.is_some_and(|t| cloudlet.start_time() > t),
        })
        .collect()
}

/// Aggregate metrics over one run.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryMetrics {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub affected_by_failover: usize,
    /// Mean busy time of successful cloudlets.
    pub avg_execution_time: f64,
    /// Mean waiting time of successful cloudlets.
    pub avg_wait_time: f64,
    /// Mean finish time of successful cloudlets.
    pub avg_finish_time: f64,
}

/// Computes the run summary; averages are over successful cloudlets and are
/// zero when there are none.
pub fn summarize(records: &[CloudletRecord]) -> SummaryMetrics {
    let succeeded: Vec<&CloudletRecord> = records
        .iter()
        .filter(|r| r.status == CloudletStatus::Success.to_string())
        .collect();
    let n = succeeded.len();
    let avg = |f: fn(&CloudletRecord) -> f64| {
        if n == 0 {
            0.
        } else {
            succeeded.iter().map(|r| f(r)).sum::<f64>() / n as f64
        }
    };
    SummaryMetrics {
        total: records.len(),
        succeeded: n,
        failed: records.len() - n,
        affected_by_failover: records.iter().filter(|r| r.affected_by_failover).count(),
        avg_execution_time: avg(|r| r.execution_time),
        avg_wait_time: avg(|r| r.wait_time),
        avg_finish_time: avg(|r| r.finish_time),
    }
}

/// Writes report rows to a CSV file with a header row.
pub fn save_to_csv(records: &[CloudletRecord], path: &str) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: &str, exec: f64, wait: f64, finish: f64, affected: bool) -> CloudletRecord {
        CloudletRecord {
            cloudlet_id: 0,
            status: status.to_string(),
            datacenter_id: 1,
            vm_id: 0,
            execution_time: exec,
            wait_time: wait,
            start_time: 0.,
            finish_time: finish,
            affected_by_failover: affected,
        }
    }

    #[test]
    fn summary_of_empty_run_is_all_zeros() {
        let summary = summarize(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.avg_execution_time, 0.);
        assert_eq!(summary.avg_finish_time, 0.);
    }

    #[test]
    fn averages_cover_successful_cloudlets_only() {
        let records = vec![
            record("Success", 10., 0., 10., false),
            record("Success", 20., 2., 22., true),
            record("Failed", 5., 100., -1., false),
        ];
        let summary = summarize(&records);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.affected_by_failover, 1);
        assert_eq!(summary.avg_execution_time, 15.);
        assert_eq!(summary.avg_wait_time, 1.);
        assert_eq!(summary.avg_finish_time, 16.);
    }
}
