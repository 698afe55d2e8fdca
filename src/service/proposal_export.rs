use std::fmt::Write;

use crate::config::ExportConfig;
use crate::db::models::{Client, Proposal};

/// Renders a proposal as a Markdown document for sending to the client.
pub struct ProposalDocument<'a> {
    cfg: &'a ExportConfig,
}

impl<'a> ProposalDocument<'a> {
    pub fn new(cfg: &'a ExportConfig) -> Self {
        Self { cfg }
    }

    pub fn file_name(proposal: &Proposal) -> String {
        format!("propuesta-{}.md", proposal.id)
    }

    pub fn render(&self, proposal: &Proposal, client: &Client) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = self.write_document(&mut out, proposal, client);
        out
    }

    fn write_document(
        &self,
        out: &mut String,
        proposal: &Proposal,
        client: &Client,
    ) -> std::fmt::Result {
        writeln!(out, "# {}", self.cfg.company_name)?;
        writeln!(out)?;
        writeln!(out, "## Propuesta comercial #{}: {}", proposal.id, proposal.title)?;
        writeln!(out)?;
        writeln!(out, "**Fecha:** {}  ", proposal.created_at.format("%d/%m/%Y"))?;
        writeln!(out, "**Estado:** {}  ", proposal.status.label_es())?;
        if let Some(valid_until) = proposal.valid_until {
            writeln!(out, "**Válida hasta:** {}  ", valid_until.format("%d/%m/%Y"))?;
        }
        writeln!(out)?;

        writeln!(out, "### Cliente")?;
        writeln!(out)?;
        writeln!(out, "{}  ", client.name)?;
        for line in [&client.company, &client.email, &client.phone, &client.address]
            .into_iter()
            .flatten()
        {
            writeln!(out, "{line}  ")?;
        }
        writeln!(out)?;

        if let Some(description) = proposal.description.as_deref() {
            writeln!(out, "### Descripción")?;
            writeln!(out)?;
            writeln!(out, "{}", description.trim())?;
            writeln!(out)?;
        }

        writeln!(out, "| Concepto | Importe |")?;
        writeln!(out, "|---|---:|")?;
        writeln!(
            out,
            "| {} | {} {} |",
            proposal.title.replace('|', "\\|"),
            format_amount(proposal.amount),
            self.cfg.currency
        )?;
        writeln!(
            out,
            "| **Total** | **{} {}** |",
            format_amount(proposal.amount),
            self.cfg.currency
        )?;
        Ok(())
    }
}

/// `1234567.5` → `1,234,567.50`
pub fn format_amount(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((&fixed, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::status::{ClientStatus, ProposalStatus};
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn amounts_are_grouped() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(999.999), "1,000.00");
        assert_eq!(format_amount(1234567.5), "1,234,567.50");
        assert_eq!(format_amount(-3200.0), "-3,200.00");
    }

    #[test]
    fn document_lists_client_amount_and_validity() {
        let at = Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap();
        let client = Client {
            id: 7,
            name: "Lucía Fernández".into(),
            company: Some("Panadería La Espiga".into()),
            email: Some("lucia@laespiga.es".into()),
            phone: None,
            address: None,
            status: ClientStatus::Active,
            created_at: at,
            updated_at: at,
        };
        let proposal = Proposal {
            id: 12,
            client_id: 7,
            title: "Tienda online".into(),
            description: Some("Catálogo y pagos.".into()),
            amount: 3200.0,
            valid_until: NaiveDate::from_ymd_opt(2026, 11, 30),
            status: ProposalStatus::Sent,
            sent_at: Some(at),
            decided_at: None,
            created_at: at,
            updated_at: at,
        };
        let cfg = ExportConfig {
            company_name: "Estudio Norte".into(),
            currency: "EUR".into(),
        };

        let doc = ProposalDocument::new(&cfg).render(&proposal, &client);
        assert!(doc.starts_with("# Estudio Norte\n"));
        assert!(doc.contains("## Propuesta comercial #12: Tienda online"));
        assert!(doc.contains("**Estado:** Enviada"));
        assert!(doc.contains("**Válida hasta:** 30/11/2026"));
        assert!(doc.contains("Panadería La Espiga  \nlucia@laespiga.es  \n"));
        assert!(doc.contains("| **Total** | **3,200.00 EUR** |"));
        assert_eq!(ProposalDocument::file_name(&proposal), "propuesta-12.md");
    }
}
