use anyhow::bail;
use clap::ArgMatches;
use eduscope_lib::{
    config::ApiConfig,
    dashboard::{load_application_detail, ApplicationDashboard},
    error::AdmissionsError,
    join::StatusTally,
    models::{ApplicantKey, Attachment, AttachmentSlot},
    session::{ApplicantFormSession, ApplicationFormSession, FormMode, SubmitOutcome},
    store::RecordStore,
    validators::FormField,
};
use log::warn;

/// Options shared by `apply` and `edit`.
pub struct ApplicationArgs {
    activities: Vec<String>,
    other: Option<String>,
    photo: Option<String>,
    birth_certificate: Option<String>,
    health_record: Option<String>,
}

impl ApplicationArgs {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            activities: matches
                .get_many::<String>("activity")
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
            other: matches.get_one::<String>("other").cloned(),
            photo: matches.get_one::<String>("photo").cloned(),
            birth_certificate: matches.get_one::<String>("birth-certificate").cloned(),
            health_record: matches.get_one::<String>("health-record").cloned(),
        }
    }

    fn file(&self, slot: AttachmentSlot) -> anyhow::Result<Option<Attachment>> {
        let path = match slot {
            AttachmentSlot::Photo => &self.photo,
            AttachmentSlot::BirthCertificate => &self.birth_certificate,
            AttachmentSlot::HealthRecord => &self.health_record,
        };
        match path {
            Some(path) => match Attachment::from_path(path) {
                Ok(file) => Ok(Some(file)),
                Err(e) => bail!("Could not read {}: {}", path, e),
            },
            None => Ok(None),
        }
    }

    /// Only touches what was given on the command line.
    fn apply_to(&self, session: &mut ApplicationFormSession<RecordStore>) -> anyhow::Result<()> {
        if !self.activities.is_empty() {
            let current = session.values().extra_curriculars_checked.clone();
            for label in current {
                session.set_activity(&label, false);
            }
            for label in &self.activities {
                session.set_activity(label, true);
            }
        }
        if let Some(other) = &self.other {
            session.set_other_activities(other.as_str());
        }
        if let Some(file) = self.file(AttachmentSlot::Photo)? {
            session.select_photo(Some(file));
        }
        if let Some(file) = self.file(AttachmentSlot::BirthCertificate)? {
            session.select_birth_certificate(Some(file));
        }
        if let Some(file) = self.file(AttachmentSlot::HealthRecord)? {
            session.select_health_record(Some(file));
        }
        Ok(())
    }
}

fn report(result: Result<SubmitOutcome, AdmissionsError>) -> anyhow::Result<SubmitOutcome> {
    match result {
        Ok(outcome) => Ok(outcome),
        Err(AdmissionsError::Validation(errors)) => {
            for (field, reason) in errors.iter() {
                println!("  {:<18} {}", field.as_str(), reason);
            }
            bail!("{} field(s) need attention", errors.len())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn list_applicants(config: ApiConfig) -> anyhow::Result<()> {
    let mut dashboard = ApplicationDashboard::new(RecordStore::new(config));
    dashboard.load().await?;
    let Some(data) = dashboard.data() else {
        return Ok(());
    };
    if !data.index().unresolved().is_empty() {
        warn!(
            "{} application(s) reference no known applicant",
            data.index().unresolved().len()
        );
    }
    println!("{:>5}  {:<32} {:<32} {}", "ID", "NAME", "EMAIL", "LATEST STATUS");
    for row in data.applicant_rows() {
        println!(
            "{:>5}  {:<32} {:<32} {}",
            row.applicant.id,
            row.applicant.display_name(),
            row.applicant.email,
            row.latest_status
        );
    }
    Ok(())
}

pub async fn list_applications(config: ApiConfig) -> anyhow::Result<()> {
    let mut dashboard = ApplicationDashboard::new(RecordStore::new(config));
    dashboard.load().await?;
    let Some(data) = dashboard.data() else {
        return Ok(());
    };
    let tally = data.tally();
    println!(
        "Total {} | Pending {} | Approved {} | Rejected {}",
        StatusTally::padded(tally.total),
        StatusTally::padded(tally.pending),
        StatusTally::padded(tally.approved),
        StatusTally::padded(tally.rejected)
    );
    println!("{:>5}  {:<32} {:<10} {}", "ID", "APPLICANT", "STATUS", "SUBMITTED");
    for row in data.application_rows() {
        let submitted = row
            .submitted_on
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>5}  {:<32} {:<10} {}",
            row.id, row.applicant_name, row.status, submitted
        );
    }
    Ok(())
}

pub async fn show_application(config: ApiConfig, id: i64) -> anyhow::Result<()> {
    let store = RecordStore::new(config.clone());
    let detail = load_application_detail(&store, &config, id).await?;
    let application = &detail.application;

    println!("Application #{}", application.id);
    println!("  Applicant:  {}", detail.applicant_name());
    println!("  Grade:      {}", application.apply_grade);
    println!("  Status:     {}", application.status);
    if application.extra_curriculars.is_empty() {
        println!("  Activities: -");
    } else {
        println!("  Activities: {}", application.extra_curriculars.join(", "));
    }
    if let Some(submitted) = application.created() {
        println!("  Submitted:  {}", submitted.format("%Y-%m-%d %H:%M"));
    }
    for slot in AttachmentSlot::ALL {
        match detail.attachment(slot) {
            Some(link) => println!(
                "  {:<18} {} ({:?}) {}",
                slot.field_name(),
                link.file_name,
                link.kind,
                link.url
            ),
            None => println!("  {:<18} not uploaded", slot.field_name()),
        }
    }
    Ok(())
}

pub async fn add_applicant(
    config: ApiConfig,
    fields: [(FormField, String); 8],
) -> anyhow::Result<()> {
    let mut session = ApplicantFormSession::new(RecordStore::new(config));
    for (field, value) in fields {
        session.set(field, value);
    }
    if let SubmitOutcome::Created(id) = report(session.submit().await)? {
        println!("Created applicant {}", id);
    }
    Ok(())
}

pub async fn apply(
    config: ApiConfig,
    applicant: i64,
    grade: String,
    args: ApplicationArgs,
) -> anyhow::Result<()> {
    let store = RecordStore::new(config.clone());
    let mut session = ApplicationFormSession::new(store, config, FormMode::Create)
        .with_applicant(ApplicantKey(applicant));
    session.load().await?;
    if !session.applicants().iter().any(|a| a.id == applicant) {
        warn!("Applicant {} is not in the applicant list", applicant);
    }
    session.set_grade(grade);
    args.apply_to(&mut session)?;

    if let SubmitOutcome::Created(id) = report(session.submit().await)? {
        println!("Submitted application {} for applicant {}", id, applicant);
    }
    Ok(())
}

pub async fn edit_application(
    config: ApiConfig,
    id: i64,
    grade: Option<String>,
    status: Option<String>,
    args: ApplicationArgs,
) -> anyhow::Result<()> {
    let store = RecordStore::new(config.clone());
    let mut session = ApplicationFormSession::new(store, config.clone(), FormMode::Edit(id));
    session.load().await?;
    if let Some(grade) = grade {
        session.set_grade(grade);
    }
    if let Some(status) = status {
        session.set_status(status);
    }
    args.apply_to(&mut session)?;

    for slot in AttachmentSlot::ALL {
        if session.values().file(slot).is_none() {
            if let Some(url) = session.existing_attachments().get(&slot) {
                println!("Keeping {} {}", slot.field_name(), url);
            }
        }
    }

    if let SubmitOutcome::ShowDetail(id) = report(session.submit().await)? {
        println!("Application {} updated", id);
        show_application(config, id).await?;
    }
    Ok(())
}

pub async fn delete_application(config: ApiConfig, id: i64) -> anyhow::Result<()> {
    let mut dashboard = ApplicationDashboard::new(RecordStore::new(config));
    dashboard.load().await?;
    dashboard.delete_application(id).await?;
    let remaining = dashboard
        .data()
        .map(|data| data.applications().len())
        .unwrap_or_default();
    println!("Deleted application {} ({} remaining)", id, remaining);
    Ok(())
}
