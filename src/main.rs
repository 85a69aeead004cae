use aws_config::BehaviorVersion;
use aws_lambda_events::event::dynamodb::Event;
use lambda_runtime::{run, service_fn, Error as LambdaError, LambdaEvent};
use tracing::error;

mod common;
mod handler;
mod push;
mod store;
mod trigger;

use crate::handler::InviteNotifier;
use crate::push::FcmGateway;
use crate::store::DynamoUserStore;

const USERS_TABLE_DEFAULT: &str = "users";

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .without_time() // CloudWatch will add the ingestion time
        .with_target(false)
        .init();

    let users_table = std::env::var("USERS_TABLE").unwrap_or(USERS_TABLE_DEFAULT.into());

    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let dynamo_client = aws_sdk_dynamodb::Client::new(&config);
    let notifier = InviteNotifier::new(
        DynamoUserStore::new(dynamo_client, users_table),
        FcmGateway::new_from_env()?,
    );

    run(service_fn(|event: LambdaEvent<Event>| async {
        let result = trigger::process_event(event, &notifier).await;

        match result {
            Ok(()) => Ok(()),
            Err(err) => {
                error!("Invite handling failed: {:?}", err);
                Err(LambdaError::from(err))
            }
        }
    }))
    .await
}
