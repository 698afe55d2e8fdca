//! Demo data for a fresh database.

use chrono::{Duration, NaiveDate, Utc};
use tracing::{info, warn};

use crate::db::sqlite::CrmStorage;
use crate::error::CrmError;
use crate::types::forms::{ClientForm, FollowUpForm, NoteForm, ProposalForm, TaskForm};
use crate::types::status::{ClientStatus, ProjectStatus, ProposalStatus};

fn client(name: &str, company: &str, email: &str, phone: &str) -> ClientForm {
    ClientForm {
        name: name.to_string(),
        company: Some(company.to_string()),
        email: Some(email.to_string()),
        phone: Some(phone.to_string()),
        address: None,
        status: Some(ClientStatus::Active),
    }
}

impl CrmStorage {
    /// Seed demo records. Does nothing unless the database has no clients.
    /// Returns whether anything was written.
    pub async fn seed_demo(&self) -> Result<bool, CrmError> {
        let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM clients")
            .fetch_one(self.pool())
            .await?;
        if existing > 0 {
            info!(existing, "database already has clients; skipping demo seed");
            return Ok(false);
        }

        let (activity_mark,): (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(id), 0) FROM activity_logs")
                .fetch_one(self.pool())
                .await?;
        let mut seeded_clients = Vec::new();
        if let Err(e) = self.seed_records(&mut seeded_clients).await {
            warn!(error = %e, "demo seed failed, removing the partial data");
            self.discard_seed(&seeded_clients, activity_mark).await?;
            return Err(e);
        }

        info!("demo data seeded");
        Ok(true)
    }

    /// Removes what a failed seed wrote so the next start sees an empty database again.
    async fn discard_seed(&self, client_ids: &[i64], activity_mark: i64) -> Result<(), CrmError> {
        let mut tx = self.pool().begin().await?;
        for id in client_ids {
            sqlx::query("DELETE FROM clients WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query("DELETE FROM activity_logs WHERE id > ?")
            .bind(activity_mark)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn seed_records(&self, seeded_clients: &mut Vec<i64>) -> Result<(), CrmError> {
        let now = Utc::now();
        let panaderia = self
            .create_client(&client(
                "Lucía Fernández",
                "Panadería La Espiga",
                "lucia@laespiga.es",
                "+34 611 223 344",
            ))
            .await?;
        seeded_clients.push(panaderia.id);
        let taller = self
            .create_client(&client(
                "Jorge Ramírez",
                "Taller Ramírez",
                "jorge@tallerramirez.com",
                "+34 622 334 455",
            ))
            .await?;
        seeded_clients.push(taller.id);
        let mut dormant = client(
            "Marta Gil",
            "Estudio Gil Arquitectura",
            "marta@estudiogil.es",
            "+34 633 445 566",
        );
        dormant.status = Some(ClientStatus::Inactive);
        let estudio = self.create_client(&dormant).await?;
        seeded_clients.push(estudio.id);

        let web = self
            .create_proposal(&ProposalForm {
                client_id: panaderia.id,
                title: "Tienda online".to_string(),
                description: Some("Catálogo, pedidos y pago con tarjeta.".to_string()),
                amount: 3_200.0,
                valid_until: NaiveDate::from_ymd_opt(2030, 12, 31),
                status: Some(ProposalStatus::Sent),
            })
            .await?;
        self.change_proposal_status(web.id, ProposalStatus::Approved)
            .await?;
        let conversion = self.convert_proposal(web.id).await?;
        self.change_project_status(conversion.project.id, ProjectStatus::InProgress)
            .await?;
        for (title, days, done) in [
            ("Reunión de arranque", -7, true),
            ("Diseño del catálogo", 7, false),
            ("Integración de pagos", 21, false),
        ] {
            let task = self
                .create_task(
                    conversion.project.id,
                    &TaskForm {
                        title: title.to_string(),
                        due_date: Some((now + Duration::days(days)).date_naive()),
                        completed: Some(done),
                    },
                )
                .await?;
            info!(task_id = task.id, "seeded task");
        }

        let mantenimiento = self
            .create_proposal(&ProposalForm {
                client_id: taller.id,
                title: "Mantenimiento anual".to_string(),
                description: None,
                amount: 900.0,
                valid_until: None,
                status: Some(ProposalStatus::Sent),
            })
            .await?;
        self.change_proposal_status(mantenimiento.id, ProposalStatus::Negotiating)
            .await?;
        self.create_proposal(&ProposalForm {
            client_id: estudio.id,
            title: "Rediseño de marca".to_string(),
            description: None,
            amount: 1_500.0,
            valid_until: None,
            status: None,
        })
        .await?;

        for (client_id, subject, hours) in [
            (taller.id, "Llamar para cerrar el precio", -2),
            (panaderia.id, "Revisar maquetas con Lucía", 48),
        ] {
            self.create_follow_up(&FollowUpForm {
                client_id,
                subject: subject.to_string(),
                details: None,
                due_at: Some(now + Duration::hours(hours)),
            })
            .await?;
        }

        self.create_note(&NoteForm {
            client_id: panaderia.id,
            body: "Prefiere comunicarse por WhatsApp por las mañanas.".to_string(),
        })
        .await?;
        Ok(())
    }
}
