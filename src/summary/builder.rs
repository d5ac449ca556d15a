use chrono::NaiveDateTime;
use rusqlite::Connection;
use uuid::Uuid;

use super::distribution::time_weighted_distribution;
use super::problems::evaluate_problems;
use super::stores::{PatientDirectory, SampleStore, SummaryCacheStore};
use super::time_of_day::time_of_day_means;
use super::SummaryError;
use crate::config::SummarySettings;
use crate::models::{PatientGlycemicProfile, Sample, SampleKind, SummaryCache};

/// Builds and caches glycemic summaries for the patients a viewer can read.
pub struct SummaryBuilder<'a> {
    samples: &'a dyn SampleStore,
    cache: &'a dyn SummaryCacheStore,
    patients: &'a dyn PatientDirectory,
    settings: SummarySettings,
}

impl<'a> SummaryBuilder<'a> {
    pub fn new(
        samples: &'a dyn SampleStore,
        cache: &'a dyn SummaryCacheStore,
        patients: &'a dyn PatientDirectory,
    ) -> Self {
        Self {
            samples,
            cache,
            patients,
            settings: SummarySettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SummarySettings) -> Self {
        self.settings = settings;
        self
    }

    /// Summaries of every patient `viewer_id` may read, in directory order.
    ///
    /// Expired entries are swept first. A live entry is returned as is;
    /// a missing one is computed from the trailing window and stored with a
    /// fresh ttl. Patients without CGM readings in the window are left out.
    pub fn get_summaries(
        &self,
        conn: &Connection,
        viewer_id: &Uuid,
        now: NaiveDateTime,
    ) -> Result<Vec<SummaryCache>, SummaryError> {
        let purged = self.cache.purge_expired(conn, &now)?;
        if purged > 0 {
            tracing::debug!(purged, "Purged expired glycemic summaries");
        }

        let patients = self.patients.list_viewable_patients(conn, viewer_id)?;
        let mut summaries = Vec::with_capacity(patients.len());
        let mut computed = 0usize;

        for patient in &patients {
            if let Some(cached) = self.cache.get(conn, &patient.patient_id)? {
                if cached.is_live(&now) {
                    tracing::debug!(patient_id = %patient.patient_id, "Summary cache hit");
                    summaries.push(cached);
                    continue;
                }
            }

            match self.compute(conn, patient, now)? {
                Some(summary) => {
                    self.cache.upsert(conn, &summary)?;
                    computed += 1;
                    summaries.push(summary);
                }
                None => {
                    tracing::debug!(
                        patient_id = %patient.patient_id,
                        "No CGM readings in window, summary skipped"
                    );
                }
            }
        }

        tracing::info!(
            viewer_id = %viewer_id,
            patients = patients.len(),
            computed,
            "Glycemic summaries assembled"
        );
        Ok(summaries)
    }

    /// Compute a summary for one patient without touching the cache.
    pub fn compute(
        &self,
        conn: &Connection,
        patient: &PatientGlycemicProfile,
        now: NaiveDateTime,
    ) -> Result<Option<SummaryCache>, SummaryError> {
        let start = now - self.settings.window();
        let samples = self
            .samples
            .query(conn, &patient.patient_id, SampleKind::Cgm, &start, &now)?;
        Ok(build_summary(patient, &samples, start, now, &self.settings))
    }
}

/// Aggregate CGM samples covering `[start, now)` into a cacheable summary.
/// `None` when there are no samples.
pub fn build_summary(
    patient: &PatientGlycemicProfile,
    samples: &[Sample],
    start: NaiveDateTime,
    now: NaiveDateTime,
    settings: &SummarySettings,
) -> Option<SummaryCache> {
    let ranges = patient.ranges.unwrap_or_default();
    let targets = patient.targets.unwrap_or_default();

    let distribution = time_weighted_distribution(&ranges, &start, samples)?;

    Some(SummaryCache {
        id: Uuid::new_v4(),
        patient_id: patient.patient_id,
        time_of_day: time_of_day_means(samples),
        distribution,
        problems: evaluate_problems(&distribution, &targets),
        ttl: now + settings.ttl(),
        created_at: now,
    })
}
