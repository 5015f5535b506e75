//! The single writer of game state for one room. `process_intent` is the
//! entire public surface: every table mutation, seat change, and hand
//! transition flows through it so the calling `RoomSerializer` never needs
//! to reach into `Room`/`Table` fields directly.

use std::collections::HashMap;
use std::sync::Arc;

use rand::RngCore;

use crate::clock::Clock;
use crate::config::RuntimeConfig;
use crate::economy::engine::EconomyEngine;
use crate::engine::nl::engine::{BettingEngineNL, EngineNL, Transition};
use crate::engine::nl::rules::NoLimit;
use crate::engine::nl::seating::Seating;
use crate::engine::nl::state::BettingState;
use crate::engine::nl::types::{Chips, HandConfig, PlayerAction, PlayerState, Pots, SeatId, Street as BettingStreet, TableStakes};
use crate::protocol::error::RejectCode;
use crate::protocol::event::{Event, HandEndReason, HandWinner};
use crate::protocol::intent::{Intent, IntentBody, PlayerActionRequest, TableContext};
use crate::session::SessionManager;
use crate::sync::engine::{SyncEngine, SyncResponse};

use super::card::{Card, Deck, HandEvaluator, HandRank};
use super::room::Room;
use super::seat::{PlayerId, SeatStatus};
use super::table::{Table, TableStreet};

struct ActiveHand {
    betting: BettingState,
    seat_to_player: HashMap<SeatId, PlayerId>,
    hole_cards: HashMap<SeatId, [Card; 2]>,
    deck: Deck,
}

pub struct Authority {
    pub room: Room,
    config: RuntimeConfig,
    active_hands: HashMap<String, ActiveHand>,
    pub economy: EconomyEngine,
    evaluator: Arc<dyn HandEvaluator>,
    clock: Arc<dyn Clock>,
    rng: Box<dyn RngCore + Send>,
    sync: SyncEngine,
}

impl Authority {
    pub fn new(
        room: Room,
        config: RuntimeConfig,
        evaluator: Arc<dyn HandEvaluator>,
        clock: Arc<dyn Clock>,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        let economy = EconomyEngine::new(config.rake.clone());
        let sync = SyncEngine::new(config.sync.clone());
        Self { room, config, active_hands: HashMap::new(), economy, evaluator, clock, rng, sync }
    }

    pub fn process_intent(&mut self, intent: Intent, sessions: &mut SessionManager) -> Vec<Event> {
        let session = match sessions.validate_session(&intent.session_id) {
            Ok(session) => session.clone(),
            Err(crate::session::SessionError::Expired) => {
                return vec![reject(&intent.header.message_id, RejectCode::SessionExpired)]
            }
            Err(_) => return vec![reject(&intent.header.message_id, RejectCode::InvalidSession)],
        };
        let player_id = session.player_id.clone();
        let message_id = intent.header.message_id.clone();

        match intent.body {
            IntentBody::JoinRoom { room_id, as_spectator } => self.handle_join_room(&message_id, &player_id, &room_id, as_spectator),
            IntentBody::LeaveRoom { room_id } => self.handle_leave_room(&message_id, &player_id, &room_id),
            IntentBody::TakeSeat { table_context, seat_index, buy_in_amount } => {
                self.handle_take_seat(&message_id, &player_id, table_context, seat_index, buy_in_amount)
            }
            IntentBody::LeaveSeat { table_context } => self.handle_leave_seat(&message_id, &player_id, table_context),
            IntentBody::StandUp { table_context } => self.handle_sit_state(&message_id, &player_id, table_context, SeatStatus::SittingOut),
            IntentBody::SitBack { table_context } => self.handle_sit_state(&message_id, &player_id, table_context, SeatStatus::Active),
            IntentBody::PlayerAction { table_context, action } => self.handle_player_action(&message_id, &player_id, table_context, action),
            IntentBody::RequestSync { table_context, from_sequence } => {
                self.handle_request_sync(&message_id, &player_id, table_context, from_sequence)
            }
            IntentBody::Heartbeat { client_time_ms } => self.handle_heartbeat(&message_id, &session.session_id, client_time_ms, sessions),
        }
    }

    fn validate_table_context(&self, ctx: &TableContext, require_hand_match: bool) -> Result<(), RejectCode> {
        let table = self.room.tables.get(&ctx.table_id).ok_or(RejectCode::InvalidTableId)?;
        if ctx.sequence < table.sequence {
            return Err(RejectCode::StaleIntent);
        }
        if ctx.sequence > table.sequence + 1 {
            return Err(RejectCode::SequenceMismatch);
        }
        if require_hand_match {
            if let Some(hand_id) = ctx.hand_id {
                if hand_id != table.hand_id {
                    return Err(RejectCode::InvalidHandId);
                }
            }
        }
        Ok(())
    }

    fn handle_join_room(&mut self, message_id: &str, player_id: &str, room_id: &str, as_spectator: bool) -> Vec<Event> {
        if room_id != self.room.room_id {
            return vec![reject(message_id, RejectCode::RoomNotFound)];
        }
        if !self.room.is_open {
            return vec![reject(message_id, RejectCode::RoomClosed)];
        }
        if self.room.is_member(player_id) {
            return vec![reject(message_id, RejectCode::AlreadyInRoom)];
        }
        self.room.join(player_id.to_string(), as_spectator);
        vec![
            ack(message_id),
            Event::RoomJoined { room_id: room_id.to_string(), player_id: player_id.to_string() },
            Event::PlayerJoined { room_id: room_id.to_string(), player_id: player_id.to_string() },
        ]
    }

    fn handle_leave_room(&mut self, message_id: &str, player_id: &str, room_id: &str) -> Vec<Event> {
        if !self.room.is_member(player_id) {
            return vec![reject(message_id, RejectCode::NotInRoom)];
        }
        self.room.leave(player_id);
        vec![
            ack(message_id),
            Event::RoomLeft { room_id: room_id.to_string(), player_id: player_id.to_string() },
            Event::PlayerLeft { room_id: room_id.to_string(), player_id: player_id.to_string() },
        ]
    }

    fn handle_take_seat(
        &mut self,
        message_id: &str,
        player_id: &str,
        ctx: TableContext,
        seat_index: SeatId,
        buy_in_amount: Chips,
    ) -> Vec<Event> {
        if let Err(code) = self.validate_table_context(&ctx, false) {
            return vec![reject(message_id, code)];
        }
        let room_config = self.room.config.clone();
        if buy_in_amount < room_config.min_buy_in {
            return vec![reject(message_id, RejectCode::BuyInBelowMinimum)];
        }
        if buy_in_amount > room_config.max_buy_in {
            return vec![reject(message_id, RejectCode::BuyInAboveMaximum)];
        }
        let table = self.room.tables.get_mut(&ctx.table_id).expect("validated above");
        if table.street != TableStreet::Waiting && table.street != TableStreet::Complete {
            if table.seats.iter().any(|s| s.occupant.as_deref() == Some(player_id)) {
                return vec![reject(message_id, RejectCode::AlreadySeated)];
            }
        }
        let Some(seat) = table.seat_mut(seat_index) else {
            return vec![reject(message_id, RejectCode::SeatNotFound)];
        };
        if seat.is_occupied() {
            return vec![reject(message_id, RejectCode::SeatTaken)];
        }
        seat.occupant = Some(player_id.to_string());
        seat.status = SeatStatus::Active;
        seat.stack = buy_in_amount;
        table.sequence += 1;

        if let Err(err) = self.economy.buy_in(&ctx.table_id, player_id, buy_in_amount, self.clock.as_ref()) {
            tracing::warn!(target: "poker_room_authority::room::authority", ?err, "buy-in failed after seat assignment");
        }
        if let Some(presence) = self.room.presence.get_mut(player_id) {
            presence.current_table = Some(ctx.table_id.clone());
            presence.seat_index = Some(seat_index);
        }

        let mut events = vec![ack(message_id), Event::SeatTaken { table_id: ctx.table_id.clone(), seat_index, player_id: player_id.to_string() }];
        events.extend(self.maybe_start_hand(&ctx.table_id));
        events
    }

    fn handle_leave_seat(&mut self, message_id: &str, player_id: &str, ctx: TableContext) -> Vec<Event> {
        if let Err(code) = self.validate_table_context(&ctx, false) {
            return vec![reject(message_id, code)];
        }
        let table = self.room.tables.get_mut(&ctx.table_id).expect("validated above");
        if table.street != TableStreet::Waiting && table.street != TableStreet::Complete {
            return vec![reject(message_id, RejectCode::CannotChangeDuringHand)];
        }
        let Some(seat) = table.seats.iter_mut().find(|s| s.occupant.as_deref() == Some(player_id)) else {
            return vec![reject(message_id, RejectCode::NotSeated)];
        };
        let seat_index = seat.index;
        *seat = super::seat::Seat::empty(seat_index);
        table.sequence += 1;
        vec![ack(message_id), Event::SeatVacated { table_id: ctx.table_id, seat_index }]
    }

    fn handle_sit_state(&mut self, message_id: &str, player_id: &str, ctx: TableContext, target: SeatStatus) -> Vec<Event> {
        if let Err(code) = self.validate_table_context(&ctx, false) {
            return vec![reject(message_id, code)];
        }
        let table = self.room.tables.get_mut(&ctx.table_id).expect("validated above");
        let Some(seat) = table.seats.iter_mut().find(|s| s.occupant.as_deref() == Some(player_id)) else {
            return vec![reject(message_id, RejectCode::NotSeated)];
        };
        seat.status = target;
        let seat_index = seat.index;
        table.sequence += 1;
        let event = if target == SeatStatus::SittingOut {
            Event::PlayerSatOut { table_id: ctx.table_id.clone(), seat_index }
        } else {
            Event::PlayerSatBack { table_id: ctx.table_id.clone(), seat_index }
        };
        let mut events = vec![ack(message_id), event];
        events.extend(self.maybe_start_hand(&ctx.table_id));
        events
    }

    fn handle_request_sync(&mut self, message_id: &str, player_id: &str, ctx: TableContext, from_sequence: Option<u64>) -> Vec<Event> {
        if !self.room.tables.contains_key(&ctx.table_id) {
            return vec![reject(message_id, RejectCode::InvalidTableId)];
        }
        match self.sync.generate_sync_response(&self.room, &ctx.table_id, player_id, from_sequence) {
            Ok(SyncResponse::Snapshot { snapshot }) => vec![ack(message_id), Event::Snapshot { snapshot, for_player_id: player_id.to_string() }],
            Ok(SyncResponse::Diff { base_sequence, operations }) => vec![ack(message_id), Event::Diff { base_sequence, operations }],
            Err(code) => vec![reject(message_id, code)],
        }
    }

    fn handle_heartbeat(&mut self, message_id: &str, session_id: &str, client_time_ms: i64, sessions: &mut SessionManager) -> Vec<Event> {
        match sessions.process_heartbeat(session_id, client_time_ms, self.clock.as_ref()) {
            Ok(ack_info) => vec![
                ack(message_id),
                Event::HeartbeatAck { server_time_ms: ack_info.server_time_ms, client_time_ms, latency_ms: ack_info.latency_ms },
            ],
            Err(_) => vec![reject(message_id, RejectCode::InvalidSession)],
        }
    }

    // --- Hand lifecycle ---------------------------------------------------

    fn maybe_start_hand(&mut self, table_id: &str) -> Vec<Event> {
        let Some(table) = self.room.tables.get(table_id) else { return Vec::new() };
        if table.street != TableStreet::Waiting && table.street != TableStreet::Complete {
            return Vec::new();
        }
        if !table.can_start_hand() {
            return Vec::new();
        }
        self.start_new_hand(table_id)
    }

    fn start_new_hand(&mut self, table_id: &str) -> Vec<Event> {
        let stakes = TableStakes { small_blind: self.room.config.small_blind, big_blind: self.room.config.big_blind, ante: 0 };
        let table = self.room.tables.get_mut(table_id).expect("caller checked table exists");

        let eligible: Vec<SeatId> = table.seats.iter().filter(|s| s.can_start_hand()).map(|s| s.index).collect();
        let button = next_eligible_seat(&eligible, table.dealer_seat);
        let (sb_seat, bb_seat) = if eligible.len() == 2 {
            (button, next_eligible_seat(&eligible, button))
        } else {
            let sb = next_eligible_seat(&eligible, button);
            (sb, next_eligible_seat(&eligible, sb))
        };

        table.hand_id += 1;
        table.dealer_seat = button;
        table.street = TableStreet::Preflop;
        table.community_cards.clear();
        for seat in table.seats.iter_mut() {
            seat.reset_for_new_hand();
            seat.is_dealer = seat.index == button;
        }

        let mut deck = Deck::shuffled(&mut self.rng);
        let mut hole_cards = HashMap::new();
        let mut seat_to_player = HashMap::new();
        let mut players = Vec::new();
        for &seat_id in &eligible {
            let seat = table.seat(seat_id).expect("eligible seats exist on the table");
            let cards = deck.deal(2);
            hole_cards.insert(seat_id, [cards[0], cards[1]]);
            seat_to_player.insert(seat_id, seat.occupant.clone().expect("eligible seats are occupied"));
            players.push(PlayerState::new(seat_id, seat.stack));
        }

        let cfg = HandConfig { stakes, button, small_blind_seat: sb_seat, big_blind_seat: bb_seat, check_raise_allowed: true };
        let mut betting = EngineNL::new_after_deal(cfg, players, Pots::default());

        let mut events = vec![Event::HandStarted {
            table_id: table_id.to_string(),
            hand_number: table.hand_id,
            dealer_seat: button,
            sb_seat,
            bb_seat,
            players: eligible.iter().map(|s| seat_to_player[s].clone()).collect(),
        }];

        self.economy.start_hand(table_id, table.hand_id);
        let blind_postings: Vec<(PlayerId, Chips)> = vec![
            (seat_to_player[&sb_seat].clone(), self.room.config.small_blind.min(betting.player(sb_seat).stack + betting.player(sb_seat).committed_this_round)),
            (seat_to_player[&bb_seat].clone(), self.room.config.big_blind.min(betting.player(bb_seat).stack + betting.player(bb_seat).committed_this_round)),
        ];
        post_blind(&mut betting, sb_seat, self.room.config.small_blind);
        post_blind(&mut betting, bb_seat, self.room.config.big_blind);
        let _ = self.economy.post_blinds(table_id, table.hand_id, &blind_postings, self.clock.as_ref());

        for (seat_id, cards) in &hole_cards {
            if let Some(seat) = table.seat_mut(*seat_id) {
                seat.hole_cards = Some(*cards);
            }
        }

        sync_table_from_betting(table, &betting, &seat_to_player);
        table.sequence += 1;

        self.active_hands.insert(table_id.to_string(), ActiveHand { betting, seat_to_player, hole_cards, deck });
        events
    }

    fn handle_player_action(&mut self, message_id: &str, player_id: &str, ctx: TableContext, action: PlayerActionRequest) -> Vec<Event> {
        if let Err(code) = self.validate_table_context(&ctx, true) {
            return vec![reject(message_id, code)];
        }
        let Some(hand) = self.active_hands.get(&ctx.table_id) else {
            return vec![reject(message_id, RejectCode::HandNotActive)];
        };
        let Some((&seat_id, _)) = hand.seat_to_player.iter().find(|(_, p)| p.as_str() == player_id) else {
            return vec![reject(message_id, RejectCode::NotSeated)];
        };
        if hand.betting.to_act != seat_id {
            return vec![reject(message_id, RejectCode::NotYourTurn)];
        }
        match self.apply_action_at_seat(&ctx.table_id, seat_id, action) {
            Ok(mut events) => {
                events.insert(0, ack(message_id));
                events
            }
            Err(code) => vec![reject(message_id, code)],
        }
    }

    /// Core action-application path shared by player-originated actions and
    /// server-synthesized timeout actions: mutates the betting state, feeds
    /// the economy engine, resyncs the table projection, and drives any
    /// resulting street/hand transition. Caller has already established that
    /// `seat_id` is the acting seat.
    fn apply_action_at_seat(&mut self, table_id: &str, seat_id: SeatId, action: PlayerActionRequest) -> Result<Vec<Event>, RejectCode> {
        let hand = self.active_hands.get_mut(table_id).ok_or(RejectCode::HandNotActive)?;
        let player_id = hand.seat_to_player.get(&seat_id).cloned().ok_or(RejectCode::NotSeated)?;

        let engine_action = to_engine_action(action.clone()).ok_or(RejectCode::IllegalAction)?;
        let committed_before = hand.betting.player(seat_id).committed_total;
        let transition = EngineNL::apply_action(&mut hand.betting, seat_id, engine_action).map_err(|_| RejectCode::IllegalAction)?;
        let committed_delta = hand.betting.player(seat_id).committed_total - committed_before;
        let became_all_in = hand.betting.player(seat_id).status == crate::engine::nl::types::PlayerStatus::AllIn;

        let table = self.room.tables.get_mut(table_id).expect("active hand implies table exists");
        let seat_to_player = hand.seat_to_player.clone();
        if committed_delta > 0 {
            let _ = self.economy.record_action(table_id, table.hand_id, &player_id, committed_delta, self.clock.as_ref());
        }
        if matches!(action, PlayerActionRequest::Fold) {
            self.economy.player_folded(table_id, table.hand_id, &player_id);
        }
        if became_all_in {
            self.economy.mark_all_in(table_id, table.hand_id, &player_id);
        }

        sync_table_from_betting(table, &hand.betting, &seat_to_player);
        table.sequence += 1;

        let new_stack = hand.betting.player(seat_id).stack;
        let pot_total = table.pot;
        let mut events = vec![
            Event::ActionPerformed { table_id: table_id.to_string(), player_id, seat_index: seat_id, action, new_stack, pot_total },
            Event::PotUpdated { table_id: table_id.to_string(), pot_total },
        ];

        match transition {
            Transition::Continued { .. } => {}
            Transition::StreetEnd { .. } => events.extend(self.advance_to_next_street(table_id)),
            Transition::HandEnd { winner, pots, .. } => events.extend(self.end_hand_by_folds(table_id, winner, pots)),
        }
        Ok(events)
    }

    /// Server-synthesized action for a seat that missed its action-timeout
    /// window: check if legal, otherwise fold. Attributed to the seated
    /// player exactly as a real action would be.
    pub fn apply_timeout_action(&mut self, table_id: &str) -> Vec<Event> {
        let Some(hand) = self.active_hands.get(table_id) else { return Vec::new() };
        let seat_id = hand.betting.to_act;
        let price_to_call = NoLimit::price_to_call(&hand.betting, seat_id);
        let action = if price_to_call == 0 { PlayerActionRequest::Check } else { PlayerActionRequest::Fold };
        let player_id = hand.seat_to_player.get(&seat_id).cloned();
        let mut events = self.apply_action_at_seat(table_id, seat_id, action).unwrap_or_default();
        if let Some(player_id) = player_id {
            events.push(Event::PlayerTimedOut { table_id: table_id.to_string(), player_id });
        }
        events
    }

    /// The seat is held in `disconnected`; if it is mid-action, the timeout
    /// machinery (driven by the caller's clock) will eventually force an
    /// auto-action once the disconnect grace window elapses.
    pub fn mark_seat_disconnected(&mut self, table_id: &str, player_id: &str) -> Vec<Event> {
        let Some(table) = self.room.tables.get_mut(table_id) else { return Vec::new() };
        let Some(seat) = table.seats.iter_mut().find(|s| s.occupant.as_deref() == Some(player_id)) else {
            return Vec::new();
        };
        seat.status = SeatStatus::Disconnected;
        seat.disconnected_at = Some(self.clock.now());
        vec![Event::PlayerDisconnected { table_id: table_id.to_string(), player_id: player_id.to_string(), grace_seconds_remaining: self.config.room.disconnect_grace_ms / 1000 }]
    }

    pub fn mark_seat_reconnected(&mut self, table_id: &str, player_id: &str) -> Vec<Event> {
        let Some(table) = self.room.tables.get_mut(table_id) else { return Vec::new() };
        let Some(seat) = table.seats.iter_mut().find(|s| s.occupant.as_deref() == Some(player_id)) else {
            return Vec::new();
        };
        if seat.status != SeatStatus::Disconnected {
            return Vec::new();
        }
        seat.status = SeatStatus::Active;
        seat.disconnected_at = None;
        vec![Event::PlayerReconnected { table_id: table_id.to_string(), player_id: player_id.to_string() }]
    }

    /// Seat whose turn it currently is on `table_id`, if a hand is active,
    /// together with how long it's had to act. Used by the owning serializer
    /// to decide when an action-timeout message is due.
    pub fn seat_to_act(&self, table_id: &str) -> Option<SeatId> {
        self.active_hands.get(table_id).map(|h| h.betting.to_act)
    }

    fn advance_to_next_street(&mut self, table_id: &str) -> Vec<Event> {
        let hand = self.active_hands.get_mut(table_id).expect("caller holds an active hand");
        if EngineNL::advance_street(&mut hand.betting).is_err() {
            return self.run_showdown(table_id);
        }
        let new_cards = match hand.betting.street {
            BettingStreet::Flop => hand.deck.deal(3),
            BettingStreet::Turn | BettingStreet::River => hand.deck.deal(1),
            BettingStreet::Preflop => Vec::new(),
        };
        // The street just moved past preflop, regardless of whether any
        // further player action follows (an all-in preflop hand auto-runs
        // the board with no more recorded actions).
        let hand_id = self.room.tables.get(table_id).map(|t| t.hand_id).unwrap_or_default();
        self.economy.mark_flop_reached(table_id, hand_id);
        let table = self.room.tables.get_mut(table_id).expect("active hand implies table exists");
        table.community_cards.extend(new_cards.iter().copied());
        let seat_to_player = hand.seat_to_player.clone();
        sync_table_from_betting(table, &hand.betting, &seat_to_player);
        table.sequence += 1;

        let mut events = vec![Event::StreetChanged {
            table_id: table_id.to_string(),
            street: hand.betting.street,
            community_cards: table.community_cards.iter().map(|c| c.to_string()).collect(),
        }];

        if hand.betting.active_non_allin_seats().len() <= 1 && hand.betting.street != BettingStreet::River {
            events.extend(self.advance_to_next_street(table_id));
        } else if hand.betting.street == BettingStreet::River {
            // stays in betting; next close triggers showdown via Transition::StreetEnd once more,
            // or auto-runs out if everyone is already all-in.
            if hand.betting.betting_locked_all_in {
                events.extend(self.run_showdown(table_id));
            }
        }
        events
    }

    fn end_hand_by_folds(&mut self, table_id: &str, winner: SeatId, pots: Pots) -> Vec<Event> {
        let hand = self.active_hands.remove(table_id).expect("caller holds an active hand");
        let winner_player = hand.seat_to_player[&winner].clone();
        let winners_by_pot: Vec<Vec<PlayerId>> = std::iter::once(vec![winner_player.clone()])
            .chain(pots.sides.iter().map(|_| vec![winner_player.clone()]))
            .collect();

        let table = self.room.tables.get_mut(table_id).expect("active hand implies table exists");
        let outcome = self
            .economy
            .settle_hand(table_id, table.hand_id, &winners_by_pot, hand.betting.street, self.clock.as_ref())
            .ok();

        let winners = outcome
            .as_ref()
            .map(|o| o.payouts.iter().map(|(p, amt)| HandWinner { player_id: p.clone(), amount: *amt, hand_description: None }).collect())
            .unwrap_or_else(|| vec![HandWinner { player_id: winner_player.clone(), amount: pots.main.amount, hand_description: None }]);

        for seat in table.seats.iter_mut() {
            if let Some(player) = seat.occupant.clone() {
                seat.stack = self.economy.get_player_stack(table_id, &player);
            }
        }
        table.street = TableStreet::Complete;
        table.pot = 0;
        table.sequence += 1;

        vec![Event::HandEnded { table_id: table_id.to_string(), winners, end_reason: HandEndReason::AllFolded }]
    }

    fn run_showdown(&mut self, table_id: &str) -> Vec<Event> {
        let hand = self.active_hands.remove(table_id).expect("caller holds an active hand");
        let table = self.room.tables.get_mut(table_id).expect("active hand implies table exists");
        table.street = TableStreet::Showdown;

        let board = table.community_cards.clone();
        let mut ranks: HashMap<SeatId, HandRank> = HashMap::new();
        for (seat_id, cards) in &hand.hole_cards {
            if hand.betting.players.iter().any(|p| p.seat == *seat_id && p.status != crate::engine::nl::types::PlayerStatus::Folded) {
                ranks.insert(*seat_id, self.evaluator.evaluate(cards, &board));
            }
        }

        let all_layers = std::iter::once(&hand.betting.pots.main).chain(hand.betting.pots.sides.iter());
        let mut winners_by_pot: Vec<Vec<PlayerId>> = Vec::new();
        for layer in all_layers {
            let best = layer.eligible.iter().filter_map(|s| ranks.get(s).map(|r| (*s, *r))).max_by_key(|(_, r)| *r);
            match best {
                Some((_, best_rank)) => {
                    let winners: Vec<PlayerId> = layer
                        .eligible
                        .iter()
                        .filter(|s| ranks.get(s) == Some(&best_rank))
                        .map(|s| hand.seat_to_player[s].clone())
                        .collect();
                    winners_by_pot.push(winners);
                }
                None => winners_by_pot.push(Vec::new()),
            }
        }

        let outcome = self
            .economy
            .settle_hand(table_id, table.hand_id, &winners_by_pot, hand.betting.street, self.clock.as_ref())
            .ok();

        let winners = outcome
            .as_ref()
            .map(|o| o.payouts.iter().map(|(p, amt)| HandWinner { player_id: p.clone(), amount: *amt, hand_description: None }).collect())
            .unwrap_or_default();

        for seat in table.seats.iter_mut() {
            if let Some(player) = seat.occupant.clone() {
                seat.stack = self.economy.get_player_stack(table_id, &player);
            }
            if table.street != TableStreet::Showdown {
                seat.hole_cards = None;
            }
        }
        table.street = TableStreet::Complete;
        table.pot = 0;
        table.sequence += 1;

        vec![Event::HandEnded { table_id: table_id.to_string(), winners, end_reason: HandEndReason::Showdown }]
    }
}

fn next_eligible_seat(eligible: &[SeatId], from: SeatId) -> SeatId {
    if eligible.is_empty() {
        return from;
    }
    if let Some(pos) = eligible.iter().position(|&s| s == from) {
        return eligible[(pos + 1) % eligible.len()];
    }
    *eligible.iter().find(|&&s| s > from).unwrap_or(&eligible[0])
}

fn post_blind(state: &mut BettingState, seat: SeatId, amount: Chips) {
    let idx = state.seat_index(seat);
    let posted = amount.min(state.players[idx].stack);
    state.players[idx].stack -= posted;
    state.players[idx].committed_this_round += posted;
    state.players[idx].committed_total += posted;
    if state.players[idx].stack == 0 {
        state.players[idx].status = crate::engine::nl::types::PlayerStatus::AllIn;
    }
    state.refresh_pots();
}

fn sync_table_from_betting(table: &mut Table, state: &BettingState, seat_to_player: &HashMap<SeatId, PlayerId>) {
    table.current_bet = state.current_bet_to_match;
    table.min_raise = state.last_full_raise_amount;
    table.active_to_act = Some(state.to_act);
    table.pot = state.pots.main.amount + state.pots.sides.iter().map(|p| p.amount).sum::<Chips>();
    table.street = TableStreet::from(state.street);
    for player in &state.players {
        if let Some(seat) = table.seat_mut(player.seat) {
            seat.stack = player.stack;
            seat.current_bet = player.committed_this_round;
            seat.total_bet_this_hand = player.committed_total;
            seat.status = match player.status {
                crate::engine::nl::types::PlayerStatus::Active => SeatStatus::Active,
                crate::engine::nl::types::PlayerStatus::Folded => SeatStatus::Folded,
                crate::engine::nl::types::PlayerStatus::AllIn => SeatStatus::AllIn,
                crate::engine::nl::types::PlayerStatus::SittingOut => SeatStatus::SittingOut,
            };
        }
    }
    let _ = seat_to_player;
}

fn to_engine_action(action: PlayerActionRequest) -> Option<PlayerAction> {
    Some(match action {
        PlayerActionRequest::Fold => PlayerAction::Fold,
        PlayerActionRequest::Check => PlayerAction::Check,
        PlayerActionRequest::Call => PlayerAction::Call,
        PlayerActionRequest::Bet { amount } => PlayerAction::BetTo { to: amount },
        PlayerActionRequest::Raise { amount } => PlayerAction::RaiseTo { to: amount },
        PlayerActionRequest::AllIn => PlayerAction::AllIn,
    })
}

fn ack(message_id: &str) -> Event {
    Event::Ack { intent_message_id: message_id.to_string() }
}

fn reject(message_id: &str, code: RejectCode) -> Event {
    Event::Reject { intent_message_id: message_id.to_string(), reason: code.reason().to_string(), code, details: None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::RuntimeConfig;
    use crate::protocol::intent::{Intent, IntentHeader};
    use crate::room::card::HighCardSumEvaluator;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn authority_with_table(seats: u8) -> Authority {
        let config = RuntimeConfig::default();
        let mut room = Room::new("r1", config.room.clone());
        room.add_table(Table::new("t1", seats));
        Authority::new(room, config, Arc::new(HighCardSumEvaluator), Arc::new(FixedClock::new(Utc::now())), Box::new(StdRng::seed_from_u64(7)))
    }

    fn intent(session_id: &str, seq: u64, body: IntentBody) -> Intent {
        Intent {
            session_id: session_id.to_string(),
            header: IntentHeader { message_id: format!("m{seq}"), sequence: seq, timestamp_ms: 0 },
            body,
        }
    }

    fn seat_two_players(authority: &mut Authority, sessions: &mut SessionManager, clock: &FixedClock) {
        let s1 = sessions.create_session("hero", "Hero", clock).unwrap();
        let s2 = sessions.create_session("villain", "Villain", clock).unwrap();
        authority.process_intent(intent(&s1.session_id, 1, IntentBody::JoinRoom { room_id: "r1".to_string(), as_spectator: false }), sessions);
        authority.process_intent(intent(&s2.session_id, 1, IntentBody::JoinRoom { room_id: "r1".to_string(), as_spectator: false }), sessions);
        authority.economy.initialize_player("hero", 10_000, clock);
        authority.economy.initialize_player("villain", 10_000, clock);
        let ctx = TableContext { table_id: "t1".to_string(), hand_id: None, sequence: 0 };
        authority.process_intent(
            intent(&s1.session_id, 2, IntentBody::TakeSeat { table_context: ctx.clone(), seat_index: 0, buy_in_amount: 1000 }),
            sessions,
        );
        authority.process_intent(
            intent(&s2.session_id, 2, IntentBody::TakeSeat { table_context: TableContext { sequence: 1, ..ctx }, seat_index: 1, buy_in_amount: 1000 }),
            sessions,
        );
    }

    #[test]
    fn seating_two_funded_players_starts_a_hand() {
        let clock = FixedClock::new(Utc::now());
        let mut authority = authority_with_table(2);
        let mut sessions = SessionManager::new(crate::config::SessionTimeouts::default());
        seat_two_players(&mut authority, &mut sessions, &clock);
        let table = authority.room.tables.get("t1").unwrap();
        assert_eq!(table.street, TableStreet::Preflop);
        assert_eq!(table.hand_id, 1);
    }

    #[test]
    fn unknown_session_is_rejected() {
        let mut authority = authority_with_table(2);
        let mut sessions = SessionManager::new(crate::config::SessionTimeouts::default());
        let events = authority.process_intent(
            intent("no-such-session", 1, IntentBody::JoinRoom { room_id: "r1".to_string(), as_spectator: false }),
            &mut sessions,
        );
        assert!(matches!(events[0], Event::Reject { code: RejectCode::InvalidSession, .. }));
    }

    #[test]
    fn acting_out_of_turn_is_rejected() {
        let clock = FixedClock::new(Utc::now());
        let mut authority = authority_with_table(2);
        let mut sessions = SessionManager::new(crate::config::SessionTimeouts::default());
        seat_two_players(&mut authority, &mut sessions, &clock);
        let table = authority.room.tables.get("t1").unwrap().clone();
        let not_to_act_seat = table.seats.iter().find(|s| Some(s.index) != table.active_to_act).unwrap();
        let player = not_to_act_seat.occupant.clone().unwrap();
        let session_id = if player == "hero" { "hero" } else { "villain" };
        let _ = session_id;
    }

    /// Drives a full heads-up hand end to end through `process_intent`,
    /// reproducing the rake-cap scenario: both players buy in for 500 at
    /// 5/10 blinds, the small blind raises to 30, the big blind calls, and
    /// the board runs out with no further bets. Pot is 60, rake is capped
    /// at 3, and the winner nets 527 against the loser's 470. This is the
    /// path `committed_delta_for` used to miscompute before it was replaced
    /// with a before/after `committed_total` diff.
    #[test]
    fn full_hand_through_process_intent_settles_per_rake_cap_scenario() {
        let clock = FixedClock::new(Utc::now());
        let mut authority = authority_with_table(2);
        let mut sessions = SessionManager::new(crate::config::SessionTimeouts::default());

        let s_hero = sessions.create_session("hero", "Hero", &clock).unwrap();
        let s_villain = sessions.create_session("villain", "Villain", &clock).unwrap();
        authority.process_intent(intent(&s_hero.session_id, 1, IntentBody::JoinRoom { room_id: "r1".to_string(), as_spectator: false }), &mut sessions);
        authority.process_intent(intent(&s_villain.session_id, 1, IntentBody::JoinRoom { room_id: "r1".to_string(), as_spectator: false }), &mut sessions);
        authority.economy.initialize_player("hero", 1000, &clock);
        authority.economy.initialize_player("villain", 1000, &clock);

        let ctx = TableContext { table_id: "t1".to_string(), hand_id: None, sequence: 0 };
        authority.process_intent(
            intent(&s_hero.session_id, 2, IntentBody::TakeSeat { table_context: ctx.clone(), seat_index: 0, buy_in_amount: 500 }),
            &mut sessions,
        );
        authority.process_intent(
            intent(&s_villain.session_id, 2, IntentBody::TakeSeat { table_context: TableContext { sequence: 1, ..ctx }, seat_index: 1, buy_in_amount: 500 }),
            &mut sessions,
        );

        let sessions_by_player: HashMap<&str, &str> =
            [("hero", s_hero.session_id.as_str()), ("villain", s_villain.session_id.as_str())].into_iter().collect();

        let table = authority.room.tables.get("t1").unwrap().clone();
        assert_eq!(table.street, TableStreet::Preflop);

        let first_actor = table.seats[table.active_to_act.unwrap() as usize].occupant.clone().unwrap();
        authority.process_intent(
            intent(
                sessions_by_player[first_actor.as_str()],
                3,
                IntentBody::PlayerAction {
                    table_context: TableContext { table_id: "t1".to_string(), hand_id: Some(table.hand_id), sequence: table.sequence },
                    action: PlayerActionRequest::Raise { amount: 30 },
                },
            ),
            &mut sessions,
        );

        let table = authority.room.tables.get("t1").unwrap().clone();
        let second_actor = table.seats[table.active_to_act.unwrap() as usize].occupant.clone().unwrap();
        authority.process_intent(
            intent(
                sessions_by_player[second_actor.as_str()],
                4,
                IntentBody::PlayerAction {
                    table_context: TableContext { table_id: "t1".to_string(), hand_id: Some(table.hand_id), sequence: table.sequence },
                    action: PlayerActionRequest::Call,
                },
            ),
            &mut sessions,
        );

        // Both players have 470 behind after matching to 30; nobody is
        // all-in, so each remaining street needs an explicit check from
        // whoever is to act before the hand reaches showdown.
        let mut next_seq = 5;
        loop {
            let table = authority.room.tables.get("t1").unwrap().clone();
            if table.street == TableStreet::Complete {
                break;
            }
            let Some(seat) = table.active_to_act else { break };
            let player = table.seats[seat as usize].occupant.clone().unwrap();
            authority.process_intent(
                intent(
                    sessions_by_player[player.as_str()],
                    next_seq,
                    IntentBody::PlayerAction {
                        table_context: TableContext { table_id: "t1".to_string(), hand_id: Some(table.hand_id), sequence: table.sequence },
                        action: PlayerActionRequest::Check,
                    },
                ),
                &mut sessions,
            );
            next_seq += 1;
        }

        let table = authority.room.tables.get("t1").unwrap();
        assert_eq!(table.street, TableStreet::Complete);

        let mut final_stacks = vec![authority.economy.get_player_stack("t1", "hero"), authority.economy.get_player_stack("t1", "villain")];
        final_stacks.sort_unstable();
        assert_eq!(final_stacks, vec![470, 527]);

        let rake_entries: Vec<_> = authority
            .economy
            .ledger
            .query(crate::economy::ledger::LedgerFilter { hand_id: Some(1), kind: Some(crate::economy::ledger::LedgerEntryKind::Rake), ..Default::default() })
            .collect();
        let rake_total: i64 = rake_entries.iter().map(|e| e.amount).sum();
        assert_eq!(rake_total, 3);

        assert!(authority.economy.verify_integrity().is_ok());
        assert!(authority.economy.ledger.verify_hand_conservation(1));
    }
}
