use clap::{arg, ArgAction, ArgMatches, Command};
use commands::{
    add_applicant, apply, delete_application, edit_application, list_applicants,
    list_applications, show_application, ApplicationArgs,
};
use eduscope_lib::{
    config::{self, ApiConfig},
    validators::FormField,
};

pub mod commands;

fn application_args(command: Command) -> Command {
    command
        .arg(
            arg!(--activity <LABEL> "Predefined activity (Sports, Music, Art, Debate, Scouts, Coding Club)")
                .required(false)
                .action(ArgAction::Append),
        )
        .arg(arg!(--other <TEXT> "Other activities, comma separated").required(false))
        .arg(arg!(--photo <PATH> "Photo to upload").required(false))
        .arg(arg!(--"birth-certificate" <PATH> "Birth certificate to upload").required(false))
        .arg(arg!(--"health-record" <PATH> "Health record to upload").required(false))
}

fn cli() -> Command {
    Command::new("eduscope")
        .about("EduScope CLI - Admissions intake for applicants and their applications")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            arg!(--"api-url" <URL> "API base url, overrides EDUSCOPE_API_URL")
                .required(false)
                .global(true),
        )
        .subcommand(Command::new("applicants").about("Lists applicants with their latest status"))
        .subcommand(
            Command::new("applications").about("Lists applications with a status summary"),
        )
        .subcommand(
            Command::new("show")
                .about("Shows one application and its documents")
                .arg(arg!(<ID> "Application id"))
                .arg_required_else_help(true),
        )
        .subcommand(
            Command::new("add-applicant")
                .about("Registers a new applicant")
                .arg(arg!(--"first-name" <NAME>).required(true))
                .arg(arg!(--"last-name" <NAME>).required(true))
                .arg(arg!(--gender <GENDER> "male, female or other").required(true))
                .arg(arg!(--dob <DATE> "Date of birth, YYYY-MM-DD").required(true))
                .arg(arg!(--guardian <NAME> "Guardian name").required(true))
                .arg(arg!(--email <EMAIL>).required(true))
                .arg(arg!(--phone <PHONE> "International format, e.g. +94771234567").required(true))
                .arg(arg!(--address <ADDRESS>).required(true)),
        )
        .subcommand(application_args(
            Command::new("apply")
                .about("Submits a new application for an applicant")
                .arg(arg!(<APPLICANT_ID> "Applicant id"))
                .arg(arg!(<GRADE> "Grade applied for, e.g. \"Grade 5\""))
                .arg_required_else_help(true),
        ))
        .subcommand(application_args(
            Command::new("edit")
                .about("Updates an application; files are only replaced when given")
                .arg(arg!(<ID> "Application id"))
                .arg(arg!(--grade <GRADE>).required(false))
                .arg(arg!(--status <STATUS> "pending, approved or rejected").required(false))
                .arg_required_else_help(true),
        ))
        .subcommand(
            Command::new("delete")
                .about("Deletes an application")
                .arg(arg!(<ID> "Application id"))
                .arg_required_else_help(true),
        )
}

fn id_arg(matches: &ArgMatches, name: &str) -> anyhow::Result<i64> {
    let raw = matches
        .get_one::<String>(name)
        .ok_or_else(|| anyhow::anyhow!("{} is required", name))?;
    raw.trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{} is not a valid id", raw))
}

fn text_arg(matches: &ArgMatches, name: &str) -> String {
    matches.get_one::<String>(name).cloned().unwrap_or_default()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let matches = cli().get_matches();
    let api_config = match matches.get_one::<String>("api-url") {
        Some(url) => ApiConfig::new(url)?,
        None => ApiConfig::from_env()?,
    };

    match matches.subcommand() {
        Some(("applicants", _)) => list_applicants(api_config).await,
        Some(("applications", _)) => list_applications(api_config).await,
        Some(("show", sub_matches)) => {
            show_application(api_config, id_arg(sub_matches, "ID")?).await
        }
        Some(("add-applicant", sub_matches)) => {
            let fields = [
                (FormField::FirstName, text_arg(sub_matches, "first-name")),
                (FormField::LastName, text_arg(sub_matches, "last-name")),
                (FormField::Gender, text_arg(sub_matches, "gender")),
                (FormField::Dob, text_arg(sub_matches, "dob")),
                (FormField::GuardianName, text_arg(sub_matches, "guardian")),
                (FormField::Email, text_arg(sub_matches, "email")),
                (FormField::Phone, text_arg(sub_matches, "phone")),
                (FormField::Address, text_arg(sub_matches, "address")),
            ];
            add_applicant(api_config, fields).await
        }
        Some(("apply", sub_matches)) => {
            let applicant = id_arg(sub_matches, "APPLICANT_ID")?;
            let args = ApplicationArgs::from_matches(sub_matches);
            apply(api_config, applicant, text_arg(sub_matches, "GRADE"), args).await
        }
        Some(("edit", sub_matches)) => {
            let id = id_arg(sub_matches, "ID")?;
            let args = ApplicationArgs::from_matches(sub_matches);
            edit_application(
                api_config,
                id,
                sub_matches.get_one::<String>("grade").cloned(),
                sub_matches.get_one::<String>("status").cloned(),
                args,
            )
            .await
        }
        Some(("delete", sub_matches)) => {
            delete_application(api_config, id_arg(sub_matches, "ID")?).await
        }
        _ => {
            println!("No subcommand was used");
            Ok(())
        }
    }
}
