use std::collections::HashMap;

use aws_lambda_events::event::dynamodb::{Event, EventRecord};
use lambda_runtime::LambdaEvent;
use serde_dynamo::{AttributeValue, Item};
use tracing::{debug, info, warn};

use crate::common::errors::Error;
use crate::common::Invite;
use crate::handler::InviteNotifier;
use crate::push::PushGateway;
use crate::store::UserStore;

const INSERT_EVENT: &str = "INSERT";
const INVITE_KEY_ATTRIBUTE: &str = "ID";

/// One newly created invite, decoded from a stream record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedInvite {
    pub invite_id: String,
    pub invite: Invite,
}

/// Decodes a stream record into a created invite. Anything that is not a
/// well-formed creation record is logged and yields `None`; the batch
/// moves on.
pub fn created_invite(record: EventRecord) -> Option<CreatedInvite> {
    if record.event_name != INSERT_EVENT {
        debug!("Ignoring {} record {}", record.event_name, record.event_id);
        return None;
    }

    let keys: HashMap<String, AttributeValue> = record.change.keys.into();
    let image: HashMap<String, AttributeValue> = record.change.new_image.into();

    if image.is_empty() {
        warn!("Creation record {} carries no document image", record.event_id);
        return None;
    }

    let invite_id = match keys.get(INVITE_KEY_ATTRIBUTE) {
        Some(AttributeValue::S(id)) => id.clone(),
        _ => {
            warn!(
                "Creation record {} carries no {} key",
                record.event_id, INVITE_KEY_ATTRIBUTE
            );
            return None;
        }
    };

    let invite: Invite = match serde_dynamo::from_item(Item::from(image)) {
        Ok(invite) => invite,
        Err(err) => {
            warn!("Skipping undecodable invite {}: {}", invite_id, err);
            return None;
        }
    };

    Some(CreatedInvite { invite_id, invite })
}

/// Handles one trigger invocation: every created invite in the batch runs
/// through the notifier, in record order.
#[tracing::instrument(skip_all)]
pub async fn process_event<S, G>(
    event: LambdaEvent<Event>,
    notifier: &InviteNotifier<S, G>,
) -> Result<(), Error>
where
    S: UserStore,
    G: PushGateway,
{
    info!("Received {} stream records", event.payload.records.len());

    for record in event.payload.records {
        let created = match created_invite(record) {
            Some(created) => created,
            None => continue,
        };

        let outcome = notifier
            .handle_invite_created(&created.invite, &created.invite_id)
            .await?;
        info!("Invite {} handled: {:?}", created.invite_id, outcome);
    }

    Ok(())
}
