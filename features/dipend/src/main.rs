use std::sync::Arc;

use dipend::{Class, DiContainer, RequireError, Token};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Logger {
    prefix: &'static str,
}
impl Logger {
    fn log(&self, message: &str) {
        println!("{} {message}", self.prefix);
    }
}

#[derive(Debug)]
struct Repo {
    logger: Arc<Logger>,
}

#[derive(Debug)]
struct Service {
    repo: Arc<Repo>,
    logger: Arc<Logger>,
}

fn main() -> Result<(), RequireError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let audit = Token::named("audit");

    let container = DiContainer::builder()
        .build_singletons_required(true)
        .build();

    container
        .add_singleton_builder(|| Logger { prefix: "[app]" })
        .add_mapped_singleton_instance(audit.clone(), Logger { prefix: "[audit]" })
        .add_singleton(
            Class::new(|args| {
                Ok(Repo {
                    logger: args.get(0)?,
                })
            })
            .inject_mapped::<Logger>(audit),
        )
        .add_transient(
            Class::new(|args| {
                Ok(Service {
                    repo: args.get(0)?,
                    logger: args.get(1)?,
                })
            })
            .inject::<Repo>()
            .inject::<Logger>(),
        );

    container.check_for_cyclic_dependencies()?.build_singletons()?;

    let first = container.get::<Service>()?;
    let second = container.get::<Service>()?;

    first.logger.log("service resolved");
    first.repo.logger.log("repo resolved");
    println!(
        "fresh service: {}, shared repo: {}",
        !Arc::ptr_eq(&first, &second),
        Arc::ptr_eq(&first.repo, &second.repo)
    );

    match container.graph_data() {
        Ok(graph) => println!("{graph:#?}"),
        Err(error) => tracing::error!("{error}"),
    }

    println!("{container:?}");
    Ok(())
}
