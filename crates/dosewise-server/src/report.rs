//! PDF export of a patient's medication and vitals history.

use std::io::BufWriter;

use chrono::{DateTime, Utc};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use dosewise_shared::adherence::AdherenceSummary;
use dosewise_shared::models::{Medication, MedicationLog, Profile, Vital};
use dosewise_shared::types::DoseStatus;

use crate::error::ServerError;

const TOP: f32 = 280.0;
const BOTTOM: f32 = 20.0;
const LINE: f32 = 4.5;

/// Everything the report shows, gathered by the handler under one lock.
#[derive(Debug, Clone)]
pub struct HistoryReport {
    pub profile: Profile,
    pub medications: Vec<Medication>,
    pub adherence: AdherenceSummary,
    pub adherence_days: u32,
    pub logs: Vec<MedicationLog>,
    pub vitals: Vec<Vital>,
    pub generated_at: DateTime<Utc>,
}

fn pdf_err(e: impl std::fmt::Display) -> ServerError {
    ServerError::Internal(format!("PDF error: {e}"))
}

/// Writes lines top to bottom and starts a new page when one fills up.
struct Writer {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl Writer {
    fn ensure_room(&mut self, needed: f32) {
        if self.y - needed < BOTTOM {
            let (page, layer) = self.doc.add_page(Mm(210.0), Mm(297.0), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP;
        }
    }

    fn heading(&mut self, text: &str) {
        self.ensure_room(12.0);
        self.y -= 4.0;
        self.layer.use_text(text, 11.0, Mm(20.0), Mm(self.y), &self.bold);
        self.y -= 6.0;
    }

    fn line(&mut self, text: &str) {
        self.ensure_room(LINE);
        self.layer.use_text(text, 9.0, Mm(25.0), Mm(self.y), &self.font);
        self.y -= LINE;
    }
}

pub fn render(report: &HistoryReport) -> Result<Vec<u8>, ServerError> {
    let title = format!("Histórico de medicação - {}", report.profile.name);
    let (doc, page1, layer1) = PdfDocument::new(&title, Mm(210.0), Mm(297.0), "Layer 1");
    let layer = doc.get_page(page1).get_layer(layer1);
    let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?;

    let mut w = Writer {
        doc,
        layer,
        font,
        bold,
        y: TOP,
    };

    w.layer.use_text(&title, 14.0, Mm(20.0), Mm(w.y), &w.bold);
    w.y -= 6.0;
    w.line(&format!(
        "Gerado em {}",
        report.generated_at.format("%d/%m/%Y %H:%M UTC")
    ));
    if let Some(age) = report.profile.age {
        w.line(&format!("Idade: {age}"));
    }
    if let Some(condition) = &report.profile.condition {
        w.line(&format!("Condição: {condition}"));
    }

    let a = &report.adherence;
    w.heading(&format!("ADESÃO ({} DIAS)", report.adherence_days));
    w.line(&format!(
        "{}% ({} de {} doses tomadas)",
        a.adherence.percentage, a.adherence.taken, a.adherence.total
    ));

    w.heading("MEDICAMENTOS");
    if report.medications.is_empty() {
        w.line("Nenhum medicamento cadastrado");
    }
    for med in &report.medications {
        let period = match med.end_date {
            Some(end) => format!("{} a {}", med.start_date.format("%d/%m/%Y"), end.format("%d/%m/%Y")),
            None => format!("desde {}", med.start_date.format("%d/%m/%Y")),
        };
        let status = if med.is_active { "" } else { " (inativo)" };
        w.line(&format!(
            "{} {} - {} - {}{}",
            med.name, med.dosage, med.frequency, period, status
        ));
    }

    w.heading("DOSES");
    if report.logs.is_empty() {
        w.line("Nenhuma dose registrada no período");
    }
    for log in &report.logs {
        let name = report
            .medications
            .iter()
            .find(|m| m.id == log.medication_id)
            .map_or("?", |m| m.name.as_str());
        let status = match log.status {
            DoseStatus::Pending => "pendente",
            DoseStatus::Taken => "tomada",
            DoseStatus::Skipped => "pulada",
            DoseStatus::Missed => "perdida",
        };
        w.line(&format!(
            "{}  {}  {}",
            log.scheduled_time.format("%d/%m %H:%M"),
            name,
            status
        ));
    }

    w.heading("SINAIS VITAIS");
    if report.vitals.is_empty() {
        w.line("Nenhum registro");
    }
    for vital in &report.vitals {
        w.line(&format!(
            "{}  {}  {}",
            vital.recorded_at.format("%d/%m/%Y %H:%M"),
            vital.reading.kind(),
            vital.reading.display_value()
        ));
    }

    let mut buf = BufWriter::new(Vec::new());
    w.doc.save(&mut buf).map_err(pdf_err)?;
    buf.into_inner().map_err(pdf_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use dosewise_shared::adherence::Adherence;
    use dosewise_shared::models::VitalReading;
    use dosewise_shared::types::Role;
    use uuid::Uuid;

    fn report(logs: usize) -> HistoryReport {
        let now = Utc::now();
        let profile = Profile {
            id: Uuid::new_v4(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            role: Role::Patient,
            age: Some(54),
            condition: Some("hipertensão".into()),
            clinic_name: None,
            crm: None,
            specialty: None,
            doctor_code: None,
            notifications_enabled: true,
            share_data: true,
            created_at: now,
            updated_at: now,
        };
        let med = Medication {
            id: Uuid::new_v4(),
            user_id: profile.id,
            name: "Losartana".into(),
            dosage: "50mg".into(),
            frequency: "1x ao dia".into(),
            instructions: None,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date: None,
            is_active: true,
            created_at: now,
        };
        let logs = (0..logs)
            .map(|i| MedicationLog {
                id: Uuid::new_v4(),
                medication_id: med.id,
                user_id: profile.id,
                scheduled_time: now - Duration::hours(i as i64),
                taken_at: None,
                status: DoseStatus::Taken,
            })
            .collect();
        HistoryReport {
            vitals: vec![Vital {
                id: Uuid::new_v4(),
                user_id: profile.id,
                reading: VitalReading::BloodPressure {
                    systolic: 130,
                    diastolic: 85,
                },
                recorded_at: now,
                notes: None,
            }],
            profile,
            medications: vec![med],
            adherence: Adherence::from_statuses([DoseStatus::Taken]).into(),
            adherence_days: 30,
            logs,
            generated_at: now,
        }
    }

    #[test]
    fn test_renders_pdf_bytes() {
        let bytes = render(&report(3)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_long_history_spans_pages() {
        let short = render(&report(1)).unwrap();
        let long = render(&report(200)).unwrap();
        assert!(long.starts_with(b"%PDF"));
        assert!(long.len() > short.len());
    }
}
