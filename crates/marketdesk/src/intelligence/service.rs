use chrono::NaiveDate;
use std::sync::Arc;

use super::insights::collect_insights;
use super::summary::SummaryGenerator;
use crate::error::DeskError;
use crate::storage::*;
use marketdesk_models::*;

pub const REPORT_READY_KIND: &str = "intelligence_report";
pub const REPORT_READY_TITLE: &str = "Intelligence summary ready";

/// Cache-or-generate flow over the report store.
pub struct IntelligenceDesk {
    storage: Arc<dyn StorageBackend>,
    generator: SummaryGenerator,
    window_days: i64,
}

impl IntelligenceDesk {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        generator: SummaryGenerator,
        window_days: i64,
    ) -> Self {
        Self {
            storage,
            generator,
            window_days,
        }
    }

    pub fn cached_report(&self) -> Result<Option<IntelligenceReport>, DeskError> {
        Ok(self.storage.latest_report()?)
    }

    /// Builds a fresh report and appends it. Nothing is written unless the
    /// completion call succeeds.
    pub async fn generate_report(
        &self,
        report_type: ReportType,
        today: NaiveDate,
    ) -> Result<IntelligenceReport, DeskError> {
        let insights = collect_insights(self.storage.as_ref(), today, self.window_days)?;
        let output = self.generator.generate(&insights).await?;

        let report = self.storage.insert_report(&NewReport {
            report_type,
            summary: output.content,
            range_start: insights.window.recent_cutoff.clone(),
            range_end: insights.window.today.clone(),
            model: output.model,
            token_usage: output.usage,
            insights_json: serde_json::to_value(&insights).map_err(StorageError::from)?,
            data_pack: output.data_pack,
        })?;

        tracing::info!(
            report_id = %report.id,
            report_type = report.report_type.as_str(),
            model = %report.model,
            "intelligence report stored"
        );
        self.notify_cmos(&report);
        Ok(report)
    }

    fn notify_cmos(&self, report: &IntelligenceReport) {
        let cmos = match self.storage.list_profiles_by_role(Role::Cmo) {
            Ok(cmos) => cmos,
            Err(e) => {
                tracing::warn!(error = %e, "could not list CMO profiles for notification");
                return;
            }
        };
        let body = format!(
            "{} report for {} to {}",
            report.report_type.as_str(),
            report.range_start,
            report.range_end
        );
        for cmo in cmos {
            if let Err(e) =
                self.storage
                    .notify(&cmo.id, REPORT_READY_KIND, REPORT_READY_TITLE, Some(&body))
            {
                tracing::warn!(user_id = %cmo.id, error = %e, "failed to queue report notification");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intelligence::llm::{ChatCompletion, ChatRequest, CompletionClient, LlmError};
    use crate::storage::sqlite::SqliteBackend;
    use async_trait::async_trait;

    struct Fixed(Option<&'static str>);

    #[async_trait]
    impl CompletionClient for Fixed {
        async fn complete(&self, _request: &ChatRequest) -> Result<ChatCompletion, LlmError> {
            match self.0 {
                Some(text) => Ok(ChatCompletion {
                    text: text.to_string(),
                    model: "stub".into(),
                    usage: None,
                }),
                None => Err(LlmError::Malformed("no content".into())),
            }
        }
    }

    fn desk(reply: Option<&'static str>) -> (Arc<SqliteBackend>, IntelligenceDesk) {
        let storage = Arc::new(SqliteBackend::open(":memory:").unwrap());
        let generator = SummaryGenerator::new(Arc::new(Fixed(reply)), 900);
        let desk = IntelligenceDesk::new(storage.clone(), generator, 7);
        (storage, desk)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[tokio::test]
    async fn generated_report_is_stored_and_cmos_notified() {
        let (storage, desk) = desk(Some("{\"headline\":\"ok\"}"));
        let cmo = storage
            .create_profile(&CreateProfile {
                email: "cmo@example.com".into(),
                display_name: None,
                role: Role::Cmo,
            })
            .unwrap();
        let member = storage
            .create_profile(&CreateProfile {
                email: "rep@example.com".into(),
                display_name: None,
                role: Role::Member,
            })
            .unwrap();

        let report = desk.generate_report(ReportType::Manual, today()).await.unwrap();
        assert_eq!(report.summary, "{\"headline\":\"ok\"}");
        assert_eq!(report.range_start, "2026-10-09");
        assert_eq!(report.range_end, "2026-10-16");
        assert_eq!(report.insights_json["window"]["today"], "2026-10-16");
        assert_eq!(report.insights_json["window"]["recent_cutoff"], report.range_start.as_str());

        let cached = desk.cached_report().unwrap().unwrap();
        assert_eq!(cached.id, report.id);

        let inbox = storage.inbox(&cmo.id, true).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].title, REPORT_READY_TITLE);
        assert!(storage.inbox(&member.id, true).unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_completion_writes_nothing() {
        let (storage, desk) = desk(None);
        let err = desk.generate_report(ReportType::Scheduled, today()).await.unwrap_err();
        assert!(matches!(err, DeskError::Llm(_)));
        assert!(storage.list_reports(10).unwrap().is_empty());
        assert!(desk.cached_report().unwrap().is_none());
    }
}
