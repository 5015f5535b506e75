//! Translates the client-facing wire `Event` stream into `IntegrityEvent`s,
//! without touching authority state. This is the seam the data-flow
//! description means by "state machine step -> ledger entries + integrity
//! events": the integrity pipeline watches the same events a room's
//! subscribers receive, it never reaches into `Authority` directly.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::economy::{HandId, PlayerId, TableId};
use crate::engine::nl::types::{Chips, Street};
use crate::protocol::event::{Event, HandEndReason};
use crate::protocol::intent::PlayerActionRequest;

use super::events::{IntegrityEvent, RecordedAction};

struct TableHandContext {
    hand_id: HandId,
    players: Vec<PlayerId>,
    street: Street,
    is_heads_up: bool,
    last_pot_total: Chips,
    last_action_at: DateTime<Utc>,
}

fn map_action(action: &PlayerActionRequest) -> (RecordedAction, bool) {
    match action {
        PlayerActionRequest::Fold => (RecordedAction::Fold, true),
        PlayerActionRequest::Check => (RecordedAction::Check, false),
        PlayerActionRequest::Call => (RecordedAction::Call, true),
        PlayerActionRequest::Bet { .. } => (RecordedAction::Bet, false),
        PlayerActionRequest::Raise { .. } => (RecordedAction::Raise, true),
        PlayerActionRequest::AllIn => (RecordedAction::AllIn, true),
    }
}

/// One per room (or per table; tables never share a hand id sequence).
/// Holds just enough per-table state — current hand id, street, and
/// running pot total — to backfill fields the wire protocol doesn't carry
/// per-action, since `Event::ActionPerformed` is deliberately thin.
#[derive(Default)]
pub struct WireEventTranslator {
    contexts: HashMap<TableId, TableHandContext>,
}

impl WireEventTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translate(&mut self, event: &Event, recorded_at: DateTime<Utc>) -> Vec<IntegrityEvent> {
        match event {
            Event::HandStarted { table_id, hand_number, dealer_seat, players, .. } => {
                self.contexts.insert(
                    table_id.clone(),
                    TableHandContext {
                        hand_id: *hand_number,
                        players: players.clone(),
                        street: Street::Preflop,
                        is_heads_up: players.len() == 2,
                        last_pot_total: 0,
                        last_action_at: recorded_at,
                    },
                );
                vec![IntegrityEvent::HandStarted {
                    table_id: table_id.clone(),
                    hand_id: *hand_number,
                    players: players.clone(),
                    dealer_seat: *dealer_seat,
                    recorded_at,
                }]
            }
            Event::ActionPerformed { table_id, player_id, seat_index, action, pot_total, .. } => {
                let Some(ctx) = self.contexts.get_mut(table_id) else { return Vec::new() };
                let (recorded_action, facing_bet) = map_action(action);
                let time_to_act_ms = (recorded_at - ctx.last_action_at).num_milliseconds().max(0) as u64;
                let amount = pot_total.saturating_sub(ctx.last_pot_total);
                ctx.last_pot_total = *pot_total;
                ctx.last_action_at = recorded_at;
                vec![IntegrityEvent::ActionTaken {
                    table_id: table_id.clone(),
                    hand_id: ctx.hand_id,
                    player_id: player_id.clone(),
                    seat: *seat_index,
                    street: ctx.street,
                    action: recorded_action,
                    amount,
                    time_to_act_ms,
                    facing_bet,
                    is_heads_up: ctx.is_heads_up,
                    recorded_at,
                }]
            }
            Event::StreetChanged { table_id, street, .. } => {
                let Some(ctx) = self.contexts.get_mut(table_id) else { return Vec::new() };
                ctx.street = *street;
                vec![IntegrityEvent::StreetAdvanced { table_id: table_id.clone(), hand_id: ctx.hand_id, street: *street, recorded_at }]
            }
            Event::HandEnded { table_id, winners, end_reason } => {
                let Some(ctx) = self.contexts.get(table_id) else { return Vec::new() };
                let went_to_showdown = *end_reason == HandEndReason::Showdown;
                winners
                    .iter()
                    .map(|winner| IntegrityEvent::PotAwarded {
                        table_id: table_id.clone(),
                        hand_id: ctx.hand_id,
                        winner: winner.player_id.clone(),
                        amount: winner.amount,
                        contributors: ctx.players.clone(),
                        went_to_showdown,
                        recorded_at,
                    })
                    .collect()
            }
            Event::PlayerTimedOut { table_id, player_id } => {
                let Some(ctx) = self.contexts.get(table_id) else { return Vec::new() };
                vec![IntegrityEvent::PlayerTimedOut { table_id: table_id.clone(), hand_id: ctx.hand_id, player_id: player_id.clone(), recorded_at }]
            }
            Event::PlayerDisconnected { table_id, player_id, .. } => {
                vec![IntegrityEvent::PlayerDisconnected { table_id: table_id.clone(), player_id: player_id.clone(), recorded_at }]
            }
            Event::PlayerReconnected { table_id, player_id } => {
                vec![IntegrityEvent::PlayerReconnected { table_id: table_id.clone(), player_id: player_id.clone(), recorded_at }]
            }
            _ => Vec::new(),
        }
    }
}
