//! The Tables domain: every table and its game, owned by one worker.
//!
//! All table and game mutation happens in the handlers below. Effects on
//! users go out as requests on the Sessions and Chat queues. Finished games
//! are written to the store from tasks the domain keeps track of, so the
//! worker never waits on persistence and shutdown waits for every write.
//! Argon2 work for table passwords runs on the blocking pool before a
//! request reaches the worker.

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, info, warn};
use std::{collections::BTreeMap, sync::Arc};
use tokio::{task::JoinSet, time::Instant};

use super::{
    config::{MAX_NOTE_LENGTH, TableOptions, hash_password, verify_password},
    errors::{TableError, TableResult},
    messages::{HypotheticalOp, TableAction, TablesRequest, TablesRequestKind as Kind},
    models::{Spectator, Table, TableDescription, TableId, TablePlayer, UserTables},
    timer::{self, TimerToken, TurnClock},
};
use crate::{
    actor::{Domain, Manager, ManagerResult, Router},
    chat::{ChatManager, ChatRequest, table_room},
    config::CoreConfig,
    game::{
        Game, GameAction, GameSnapshot, RuleViolation, card::random_seed, constants::MIN_PLAYERS,
    },
    sessions::{SessionData, SessionsManager, SessionsRequest, Status, UserId},
    store::{ArchivedTable, GameRecord, GameStore},
};

pub type TablesManager = Manager<Tables>;

/// Played to a table's owner when someone takes a seat
const SOUND_SOMEONE_JOINED: &str = "someone_joined";

pub struct Tables {
    tables: BTreeMap<TableId, Table>,
    next_id: TableId,
    sessions: SessionsManager,
    chat: ChatManager,
    /// Handle to this worker's own queue, for turn timers
    me: TablesManager,
    store: Arc<dyn GameStore>,
    config: Arc<CoreConfig>,
    /// Game records still being written
    writes: JoinSet<()>,
}

#[async_trait]
impl Domain for Tables {
    type Request = TablesRequest;
    type Kind = Kind;

    fn kind(request: &TablesRequest) -> Kind {
        request.kind()
    }

    /// Finish writing game records, then archive the tables whose game is
    /// still running so they can be restored.
    async fn on_shutdown(&mut self) {
        while let Some(result) = self.writes.join_next().await {
            if let Err(e) = result {
                error!("A game record write did not finish: {e}");
            }
        }

        let archived: Vec<ArchivedTable> = self.tables.values().filter_map(Table::archive).collect();
        if archived.is_empty() {
            return;
        }

        if let Err(e) = self.store.archive_unfinished(archived).await {
            error!("Failed to archive unfinished games: {e}");
        }
    }
}

/// Push every audience member their view of the game.
fn push_game(sessions: &SessionsManager, table: &Table) {
    let Some(game) = &table.game else {
        return;
    };
    for (user_id, seat) in table.audience() {
        let _ = sessions.submit(SessionsRequest::NotifyGame {
            user_id,
            table_id: table.id,
            view: Box::new(game.view_for(seat)),
        });
    }
}

fn push_spectators(sessions: &SessionsManager, table: &Table) {
    let spectators = table.spectator_names();
    for (user_id, _) in table.audience() {
        let _ = sessions.submit(SessionsRequest::NotifySpectators {
            user_id,
            table_id: table.id,
            spectators: spectators.clone(),
        });
    }
}

fn push_table(sessions: &SessionsManager, table: &Table) {
    let _ = sessions.submit(SessionsRequest::NotifyAllTable(table.description()));
}

fn send_chat_history(chat: &ChatManager, user_id: UserId, table_id: TableId) {
    let _ = chat.submit(ChatRequest::SendHistory {
        room: table_room(table_id),
        user_id,
    });
}

/// Status of a player sitting at `table`.
fn player_status(table: &Table) -> Status {
    match &table.game {
        None => Status::Pregame,
        Some(game) if game.is_ended() => Status::Replay,
        Some(_) => Status::Playing,
    }
}

/// Start the clock on the active seat's turn.
fn arm_timer(tables: &TablesManager, table: &Table) {
    let (Some(game), Some(clock)) = (&table.game, &table.clock) else {
        return;
    };
    if game.is_ended() || game.is_paused() {
        return;
    }

    let token = TimerToken::capture(table.id, game);
    let delay = clock.remaining(game.active_player(), Instant::now());
    timer::schedule(tables.clone(), token, delay);
}

fn on_game_end(
    sessions: &SessionsManager,
    store: &Arc<dyn GameStore>,
    writes: &mut JoinSet<()>,
    table: &mut Table,
) {
    table.clock = None;
    let Some(game) = &table.game else {
        return;
    };

    info!(
        "Table {} game ended ({}) with a score of {}/{}",
        table.id,
        game.end_condition(),
        game.score(),
        game.variant().max_score()
    );
    push_table(sessions, table);
    if table.replay {
        return;
    }

    // The table stays open to review the finished game
    for player in &table.players {
        let _ = sessions.set_status(player.user_id, Status::Replay, Some(table.id));
    }

    while writes.try_join_next().is_some() {}
    let record = game.record(&table.name);
    let store = store.clone();
    let table_id = table.id;
    writes.spawn(async move {
        match store.write_game(record).await {
            Ok(id) => info!("Saved the game of table {table_id} as game #{id}"),
            Err(e) => error!("Failed to save the game of table {table_id}: {e}"),
        }
    });
}

impl Tables {
    /// Start the Tables worker.
    pub fn spawn(
        sessions: SessionsManager,
        chat: ChatManager,
        store: Arc<dyn GameStore>,
        config: Arc<CoreConfig>,
    ) -> TablesManager {
        Manager::spawn_cyclic(
            "tables",
            |me| Self {
                tables: BTreeMap::new(),
                next_id: 1,
                sessions,
                chat,
                me,
                store,
                config,
                writes: JoinSet::new(),
            },
            Self::router(),
        )
    }

    fn router() -> Router<Self> {
        Router::new()
            .route(Kind::NewTable, Self::new_table)
            .route(Kind::GetPasswordHash, Self::get_password_hash)
            .route(Kind::Join, Self::join)
            .route(Kind::Leave, Self::leave)
            .route(Kind::Spectate, Self::spectate)
            .route(Kind::Unspectate, Self::unspectate)
            .route(Kind::NewReplay, Self::new_replay)
            .route(Kind::StartGame, Self::start_game)
            .route(Kind::Action, Self::action)
            .route(Kind::Hypothetical, Self::hypothetical)
            .route(Kind::Tag, Self::tag)
            .route(Kind::Chat, Self::chat)
            .route(Kind::ChatTyping, Self::chat_typing)
            .route(Kind::Note, Self::note)
            .route(Kind::Restore, Self::restore)
            .route(Kind::CheckTimer, Self::check_timer)
            .route(Kind::DisconnectUser, Self::disconnect_user)
            .route(Kind::IdleSweep, Self::idle_sweep)
            .route(Kind::GetTable, Self::get_table)
            .route(Kind::GetTables, Self::get_tables)
            .route(Kind::GetUserTables, Self::get_user_tables)
            .route(Kind::GetSnapshot, Self::get_snapshot)
            .route(Kind::Print, Self::print)
    }

    fn table_mut(&mut self, table_id: TableId) -> TableResult<&mut Table> {
        self.tables
            .get_mut(&table_id)
            .ok_or(TableError::NotFound(table_id))
    }

    fn next_table_id(&mut self) -> TableId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn delete_table(&mut self, table_id: TableId) {
        let Some(table) = self.tables.remove(&table_id) else {
            return;
        };

        for (user_id, _) in table.audience() {
            let _ = self.sessions.set_status(user_id, Status::Lobby, None);
        }
        let _ = self
            .sessions
            .submit(SessionsRequest::NotifyAllTableGone { table_id });
        let _ = self.chat.submit(ChatRequest::DeleteRoom {
            room: table_room(table_id),
        });
        info!("Deleted table {table_id} (\"{}\")", table.name);
    }

    // --------
    // Handlers
    // --------

    fn new_table(&mut self, request: TablesRequest) {
        if let TablesRequest::NewTable {
            owner,
            options,
            password_hash,
            reply,
        } = request
        {
            let _ = reply.send(self.create_table(&owner, options, password_hash));
        }
    }

    fn create_table(
        &mut self,
        owner: &SessionData,
        options: TableOptions,
        password_hash: Option<String>,
    ) -> TableResult<TableId> {
        let variant = options.validate(&self.config.variants)?;

        let table_id = self.next_table_id();
        let table = Table::new(table_id, owner, options, variant, password_hash);
        info!(
            "User \"{}\" created table {table_id} (\"{}\", {})",
            owner.username, table.name, table.variant.name
        );

        push_table(&self.sessions, &table);
        let _ = self
            .sessions
            .set_status(owner.user_id, Status::Pregame, Some(table_id));
        self.tables.insert(table_id, table);
        Ok(table_id)
    }

    fn get_password_hash(&mut self, request: TablesRequest) {
        if let TablesRequest::GetPasswordHash { table_id, reply } = request {
            let hash = self
                .tables
                .get(&table_id)
                .and_then(|table| table.password_hash.clone());
            let _ = reply.send(hash);
        }
    }

    fn join(&mut self, request: TablesRequest) {
        if let TablesRequest::Join {
            user,
            table_id,
            password_hash,
            reply,
        } = request
        {
            let _ = reply.send(self.join_table(&user, table_id, password_hash.as_deref()));
        }
    }

    fn join_table(
        &mut self,
        user: &SessionData,
        table_id: TableId,
        password_hash: Option<&str>,
    ) -> TableResult<Vec<String>> {
        let table = self
            .tables
            .get_mut(&table_id)
            .ok_or(TableError::NotFound(table_id))?;

        // Coming back to a kept seat
        if let Some(index) = table.player_index(user.user_id) {
            if table.players[index].present {
                return Err(TableError::AlreadyJoined);
            }
            table.players[index].present = true;
            table.touch();
            let _ = self
                .sessions
                .set_status(user.user_id, player_status(table), Some(table_id));
            let _ = self.sessions.submit(SessionsRequest::NotifyJoined {
                user_id: user.user_id,
                table_id,
            });
            push_game(&self.sessions, table);
            push_table(&self.sessions, table);
            send_chat_history(&self.chat, user.user_id, table_id);
            info!("User \"{}\" returned to table {table_id}", user.username);
            return Ok(table.player_names());
        }

        if table.is_started() {
            return Err(TableError::AlreadyStarted);
        }
        if table.players.len() >= table.options.max_players {
            return Err(TableError::Full);
        }
        if table.has_player_named(&user.username) {
            return Err(TableError::NameTaken(user.username.clone()));
        }
        if let Some(hash) = &table.password_hash
            && password_hash != Some(hash.as_str())
        {
            return Err(TableError::WrongPassword);
        }

        if let Some(index) = table.spectator_index(user.user_id) {
            table.spectators.remove(index);
        }
        table.players.push(TablePlayer::new(user));
        table.touch();
        info!(
            "User \"{}\" joined table {table_id} ({}/{})",
            user.username,
            table.players.len(),
            table.options.max_players
        );

        let _ = self
            .sessions
            .set_status(user.user_id, Status::Pregame, Some(table_id));
        let _ = self.sessions.submit(SessionsRequest::NotifyJoined {
            user_id: user.user_id,
            table_id,
        });
        let _ = self.sessions.submit(SessionsRequest::NotifySoundLobby {
            user_id: table.owner,
            file: SOUND_SOMEONE_JOINED.to_string(),
        });
        push_table(&self.sessions, table);
        send_chat_history(&self.chat, user.user_id, table_id);
        Ok(table.player_names())
    }

    fn leave(&mut self, request: TablesRequest) {
        if let TablesRequest::Leave {
            user,
            table_id,
            reply,
        } = request
        {
            let _ = reply.send(self.leave_table(&user, table_id));
        }
    }

    fn leave_table(&mut self, user: &SessionData, table_id: TableId) -> TableResult<()> {
        let table = self
            .tables
            .get_mut(&table_id)
            .ok_or(TableError::NotFound(table_id))?;
        let index = table
            .player_index(user.user_id)
            .ok_or(TableError::NotAtTable)?;
        if table.is_running() {
            return Err(TableError::GameInProgress);
        }

        table.players.remove(index);
        table.touch();
        let _ = self.sessions.set_status(user.user_id, Status::Lobby, None);
        info!("User \"{}\" left table {table_id}", user.username);

        if table.players.is_empty() {
            self.delete_table(table_id);
            return Ok(());
        }
        if table.owner == user.user_id {
            table.owner = table.players[0].user_id;
            debug!("Table {table_id} is now owned by user {}", table.owner);
        }
        push_table(&self.sessions, table);
        Ok(())
    }

    fn spectate(&mut self, request: TablesRequest) {
        if let TablesRequest::Spectate {
            user,
            table_id,
            reply,
        } = request
        {
            let _ = reply.send(self.spectate_table(&user, table_id));
        }
    }

    fn spectate_table(
        &mut self,
        user: &SessionData,
        table_id: TableId,
    ) -> TableResult<TableDescription> {
        let table = self
            .tables
            .get_mut(&table_id)
            .ok_or(TableError::NotFound(table_id))?;
        if table.spectator_index(user.user_id).is_some() {
            return Err(TableError::AlreadySpectating);
        }
        if table.player_index(user.user_id).is_some() {
            return Err(TableError::AlreadyJoined);
        }

        table.spectators.push(Spectator {
            user_id: user.user_id,
            username: user.username.clone(),
        });
        table.touch();
        let status = if table.replay {
            Status::Replay
        } else {
            Status::Spectating
        };
        let _ = self.sessions.set_status(user.user_id, status, Some(table_id));
        push_spectators(&self.sessions, table);
        push_game(&self.sessions, table);
        push_table(&self.sessions, table);
        send_chat_history(&self.chat, user.user_id, table_id);
        Ok(table.description())
    }

    fn unspectate(&mut self, request: TablesRequest) {
        if let TablesRequest::Unspectate {
            user,
            table_id,
            reply,
        } = request
        {
            let _ = reply.send(self.unspectate_table(&user, table_id));
        }
    }

    fn unspectate_table(&mut self, user: &SessionData, table_id: TableId) -> TableResult<()> {
        let table = self
            .tables
            .get_mut(&table_id)
            .ok_or(TableError::NotFound(table_id))?;
        let index = table
            .spectator_index(user.user_id)
            .ok_or(TableError::NotSpectating)?;
        table.spectators.remove(index);
        table.touch();

        let _ = self.sessions.set_status(user.user_id, Status::Lobby, None);
        if table.replay && table.spectators.is_empty() {
            self.delete_table(table_id);
            return Ok(());
        }
        push_spectators(&self.sessions, table);
        push_table(&self.sessions, table);
        Ok(())
    }

    fn new_replay(&mut self, request: TablesRequest) {
        if let TablesRequest::NewReplay {
            user,
            record,
            reply,
        } = request
        {
            let _ = reply.send(self.create_replay(&user, &record));
        }
    }

    fn create_replay(&mut self, user: &SessionData, record: &GameRecord) -> TableResult<TableId> {
        let variant = self.config.variants.get_by_id(record.variant_id)?;
        let game = Game::from_record(record, variant.clone())?;
        let options = TableOptions {
            name: format!("Replay of game #{}", record.id),
            variant: variant.name.clone(),
            max_players: record.players.len(),
            speedrun: record.options.speedrun,
            all_or_nothing: record.options.all_or_nothing,
            one_extra_card: record.options.one_extra_card,
            one_less_card: record.options.one_less_card,
            timed: record.options.timed,
            seed: Some(record.seed.clone()),
            ..TableOptions::default()
        };

        let table_id = self.next_table_id();
        let mut table = Table::new(table_id, user, options, variant, None);
        table.players.clear();
        table.spectators.push(Spectator {
            user_id: user.user_id,
            username: user.username.clone(),
        });
        table.replay = true;
        table.game = Some(game);
        info!(
            "User \"{}\" opened a replay of game #{} at table {table_id}",
            user.username, record.id
        );

        let _ = self
            .sessions
            .set_status(user.user_id, Status::Replay, Some(table_id));
        push_table(&self.sessions, &table);
        push_game(&self.sessions, &table);
        self.tables.insert(table_id, table);
        Ok(table_id)
    }

    fn start_game(&mut self, request: TablesRequest) {
        if let TablesRequest::StartGame {
            user,
            table_id,
            reply,
        } = request
        {
            let _ = reply.send(self.start_table_game(&user, table_id));
        }
    }

    fn start_table_game(&mut self, user: &SessionData, table_id: TableId) -> TableResult<()> {
        let table = self
            .tables
            .get_mut(&table_id)
            .ok_or(TableError::NotFound(table_id))?;
        if table.owner != user.user_id {
            return Err(TableError::NotOwner);
        }
        if table.is_started() {
            return Err(TableError::AlreadyStarted);
        }
        if table.players.len() < MIN_PLAYERS {
            return Err(TableError::NotEnoughPlayers);
        }

        let seed = table
            .options
            .seed
            .clone()
            .unwrap_or_else(|| random_seed(table.players.len(), &table.variant));
        let mut game = Game::new(
            table.variant.clone(),
            table.options.game_options(),
            table.player_names(),
            seed,
        )?;
        game.start()?;

        if table.options.timed {
            table.clock = Some(TurnClock::new(
                table.players.len(),
                table.options.time_base(),
                table.options.time_per_turn(),
                Instant::now(),
            ));
        }
        info!(
            "Table {table_id} started a {}-player game of \"{}\" (seed {})",
            table.players.len(),
            table.variant.name,
            game.seed()
        );
        table.game = Some(game);
        table.assign_seats();
        table.touch();

        for player in &table.players {
            let _ = self
                .sessions
                .set_status(player.user_id, Status::Playing, Some(table_id));
        }
        push_table(&self.sessions, table);
        push_game(&self.sessions, table);
        arm_timer(&self.me, table);
        Ok(())
    }

    fn action(&mut self, request: TablesRequest) {
        if let TablesRequest::Action {
            user,
            table_id,
            action,
            reply,
        } = request
        {
            let _ = reply.send(self.perform_action(&user, table_id, action));
        }
    }

    fn perform_action(
        &mut self,
        user: &SessionData,
        table_id: TableId,
        action: TableAction,
    ) -> TableResult<()> {
        let table = self.table_mut(table_id)?;
        if table.replay {
            return Err(TableError::Replay);
        }
        if table.game.is_none() {
            return Err(TableError::NoGame);
        }
        let seat = table
            .game_seat(user.user_id)
            .ok_or(TableError::NotAtTable)?;

        self.resolve(table_id, action.into_game_action(seat))
    }

    /// Apply one action to a table's game, then run the clock and the
    /// notifications that follow it.
    fn resolve(&mut self, table_id: TableId, action: GameAction) -> TableResult<()> {
        let table = self
            .tables
            .get_mut(&table_id)
            .ok_or(TableError::NotFound(table_id))?;
        let game = table.game.as_mut().ok_or(TableError::NoGame)?;

        let on_clock = game.active_player();
        let ended = game.apply(action.clone())?;
        debug!("Table {table_id}: {action}");

        if let Some(clock) = table.clock.as_mut() {
            let now = Instant::now();
            match action {
                GameAction::Pause { .. } => clock.pause(on_clock, now),
                GameAction::Unpause { .. } => clock.resume(now),
                ref action if action.is_turn_action() => clock.end_turn(on_clock, now),
                _ => {}
            }
        }
        table.touch();

        push_game(&self.sessions, table);
        if ended {
            on_game_end(&self.sessions, &self.store, &mut self.writes, table);
        } else {
            arm_timer(&self.me, table);
        }
        Ok(())
    }

    fn hypothetical(&mut self, request: TablesRequest) {
        if let TablesRequest::Hypothetical {
            user,
            table_id,
            op,
            reply,
        } = request
        {
            let _ = reply.send(self.hypothetical_op(&user, table_id, op));
        }
    }

    fn hypothetical_op(
        &mut self,
        user: &SessionData,
        table_id: TableId,
        op: HypotheticalOp,
    ) -> TableResult<()> {
        let table = self
            .tables
            .get_mut(&table_id)
            .ok_or(TableError::NotFound(table_id))?;
        if table.owner != user.user_id {
            return Err(TableError::NotOwner);
        }
        let game = table.game.as_mut().ok_or(TableError::NoGame)?;

        match op {
            HypotheticalOp::Start { turn } => game.start_hypothetical(turn)?,
            HypotheticalOp::Action(action) => {
                let seat = game
                    .hypothetical()
                    .map(Game::active_player)
                    .ok_or(RuleViolation::NotInHypothetical)?;
                game.hypothetical_action(action.into_game_action(seat))?;
            }
            HypotheticalOp::Back => game.hypothetical_back()?,
            HypotheticalOp::End => game.end_hypothetical()?,
        }
        table.touch();
        push_game(&self.sessions, table);
        Ok(())
    }

    fn tag(&mut self, request: TablesRequest) {
        if let TablesRequest::Tag {
            user,
            table_id,
            tag,
            remove,
            reply,
        } = request
        {
            let _ = reply.send(self.tag_game(&user, table_id, &tag, remove));
        }
    }

    fn tag_game(
        &mut self,
        user: &SessionData,
        table_id: TableId,
        tag: &str,
        remove: bool,
    ) -> TableResult<String> {
        let table = self.table_mut(table_id)?;
        if !table.is_member(user.user_id) {
            return Err(TableError::NotAtTable);
        }
        let game = table.game.as_mut().ok_or(TableError::NoGame)?;

        let tag = if remove {
            game.remove_tag(user.user_id, tag)?
        } else {
            game.add_tag(user.user_id, tag)?
        };
        table.touch();
        Ok(tag)
    }

    fn chat(&mut self, request: TablesRequest) {
        if let TablesRequest::Chat {
            user,
            table_id,
            msg,
            reply,
        } = request
        {
            let _ = reply.send(self.table_chat(&user, table_id, msg));
        }
    }

    /// Hand a message to the Chat worker along with the table's audience.
    fn table_chat(&mut self, user: &SessionData, table_id: TableId, msg: String) -> TableResult<()> {
        let table = self
            .tables
            .get(&table_id)
            .ok_or(TableError::NotFound(table_id))?;
        if !table.is_member(user.user_id) {
            return Err(TableError::NotAtTable);
        }

        let audience = table.audience().into_iter().map(|(id, _)| id).collect();
        let _ = self.chat.submit(ChatRequest::Chat {
            user_id: user.user_id,
            username: user.username.clone(),
            msg,
            room: table_room(table_id),
            server: false,
            audience,
        });
        Ok(())
    }

    fn chat_typing(&mut self, request: TablesRequest) {
        let TablesRequest::ChatTyping {
            user,
            table_id,
            typing,
            reply,
        } = request
        else {
            return;
        };

        let result = match self.tables.get(&table_id) {
            None => Err(TableError::NotFound(table_id)),
            Some(table) if !table.is_member(user.user_id) => Err(TableError::NotAtTable),
            Some(table) => {
                for (user_id, _) in table.audience() {
                    if user_id == user.user_id {
                        continue;
                    }
                    let _ = self.sessions.submit(SessionsRequest::NotifyChatTyping {
                        user_id,
                        table_id,
                        username: user.username.clone(),
                        typing,
                    });
                }
                Ok(())
            }
        };
        let _ = reply.send(result);
    }

    fn note(&mut self, request: TablesRequest) {
        if let TablesRequest::Note {
            user,
            table_id,
            order,
            note,
            reply,
        } = request
        {
            let _ = reply.send(self.set_note(&user, table_id, order, &note));
        }
    }

    /// Keep a player's note and show every note on that card to spectators.
    fn set_note(
        &mut self,
        user: &SessionData,
        table_id: TableId,
        order: usize,
        note: &str,
    ) -> TableResult<()> {
        let table = self
            .tables
            .get_mut(&table_id)
            .ok_or(TableError::NotFound(table_id))?;
        if table.replay {
            return Err(TableError::Replay);
        }
        let game = table.game.as_ref().ok_or(TableError::NoGame)?;
        if game.card(order).is_none() {
            return Err(TableError::NoSuchCard(order));
        }
        let note = note.trim();
        if note.chars().count() > MAX_NOTE_LENGTH {
            return Err(TableError::NoteTooLong(MAX_NOTE_LENGTH));
        }
        let index = table
            .player_index(user.user_id)
            .ok_or(TableError::NotAtTable)?;

        let notes = &mut table.players[index].notes;
        if note.is_empty() {
            notes.remove(&order);
        } else {
            notes.insert(order, note.to_string());
        }

        let notes = table.notes_on(order);
        for spectator in &table.spectators {
            let _ = self.sessions.submit(SessionsRequest::NotifyNote {
                user_id: spectator.user_id,
                table_id,
                order,
                notes: notes.clone(),
            });
        }
        Ok(())
    }

    fn restore(&mut self, request: TablesRequest) {
        if let TablesRequest::Restore { archived, reply } = request {
            let _ = reply.send(self.restore_table(*archived));
        }
    }

    /// Rebuild a table archived at shutdown. Its players start out absent
    /// and get their seats back by joining again.
    fn restore_table(&mut self, archived: ArchivedTable) -> TableResult<TableId> {
        let ArchivedTable {
            name,
            owner,
            options,
            password_hash,
            players,
            game,
        } = archived;

        let variant = self.config.variants.get(&game.variant)?;
        let game = Game::restore(game, variant.clone())?;
        let num_seats = game.players().len();
        let seated = players.len() == num_seats
            && players
                .iter()
                .all(|p| p.seat.is_some_and(|seat| seat < num_seats));
        if !seated || game.is_ended() {
            return Err(RuleViolation::InvalidSnapshot.into());
        }

        let now = Instant::now();
        let clock = options.timed.then(|| {
            let mut clock =
                TurnClock::new(num_seats, options.time_base(), options.time_per_turn(), now);
            if game.is_paused() {
                clock.pause(game.active_player(), now);
            }
            clock
        });

        let table_id = self.next_table_id();
        let table = Table {
            id: table_id,
            name,
            owner,
            options,
            variant,
            password_hash,
            players: players
                .into_iter()
                .map(|player| TablePlayer {
                    present: false,
                    ..player
                })
                .collect(),
            spectators: Vec::new(),
            game: Some(game),
            replay: false,
            clock,
            created_at: Utc::now(),
            last_activity: now,
        };
        info!(
            "Restored table {table_id} (\"{}\") on turn {}",
            table.name,
            table.game.as_ref().map_or(0, Game::turn)
        );

        push_table(&self.sessions, &table);
        arm_timer(&self.me, &table);
        self.tables.insert(table_id, table);
        Ok(table_id)
    }

    fn check_timer(&mut self, request: TablesRequest) {
        let TablesRequest::CheckTimer(token) = request else {
            return;
        };

        let Some(table) = self.tables.get(&token.table_id) else {
            debug!("Turn timer fired for deleted table {}", token.table_id);
            return;
        };
        let Some(game) = &table.game else {
            return;
        };
        if !token.is_current(game) {
            debug!(
                "Stale turn timer for table {} (armed on turn {})",
                token.table_id, token.turn
            );
            return;
        }

        let seat = game.active_player();
        match table.seated_at(seat) {
            Some(player) => info!(
                "Time ran out for \"{}\" at table {}{}",
                player.username,
                token.table_id,
                if player.present { "" } else { " (disconnected)" }
            ),
            None => info!("Time ran out for seat {seat} at table {}", token.table_id),
        }
        if let Err(e) = self.resolve(token.table_id, GameAction::Timeout { player: seat }) {
            warn!("Failed to time out table {}: {e}", token.table_id);
        }
    }

    fn disconnect_user(&mut self, request: TablesRequest) {
        let TablesRequest::DisconnectUser { user_id } = request else {
            return;
        };

        let mut abandoned = Vec::new();
        for table in self.tables.values_mut() {
            let mut changed = false;
            if let Some(index) = table.spectator_index(user_id) {
                table.spectators.remove(index);
                push_spectators(&self.sessions, table);
                changed = true;
            }
            if let Some(index) = table.player_index(user_id)
                && table.players[index].present
            {
                table.players[index].present = false;
                changed = true;
            }

            if changed {
                debug!("User {user_id} disconnected from table {}", table.id);
                push_table(&self.sessions, table);
            }
            if !table.is_running() && table.is_abandoned() {
                abandoned.push(table.id);
            }
        }

        for table_id in abandoned {
            self.delete_table(table_id);
        }
    }

    fn idle_sweep(&mut self, _request: TablesRequest) {
        let now = Instant::now();
        let idle_timeout = self.config.idle_timeout;

        let idle: Vec<TableId> = self
            .tables
            .values()
            .filter(|t| !t.replay && t.is_running())
            .filter(|t| now.saturating_duration_since(t.last_activity) >= idle_timeout)
            .map(|t| t.id)
            .collect();
        for table_id in idle {
            info!("Ending the idle game at table {table_id}");
            if let Err(e) = self.resolve(table_id, GameAction::Idle) {
                warn!("Failed to end the idle game at table {table_id}: {e}");
            }
        }

        let abandoned: Vec<TableId> = self
            .tables
            .values()
            .filter(|t| !t.is_running() && t.is_abandoned())
            .map(|t| t.id)
            .collect();
        for table_id in abandoned {
            self.delete_table(table_id);
        }
    }

    fn get_table(&mut self, request: TablesRequest) {
        if let TablesRequest::GetTable { table_id, reply } = request {
            let _ = reply.send(self.tables.get(&table_id).map(Table::description));
        }
    }

    fn get_tables(&mut self, request: TablesRequest) {
        if let TablesRequest::GetTables { reply } = request {
            let _ = reply.send(self.tables.values().map(Table::description).collect());
        }
    }

    fn get_user_tables(&mut self, request: TablesRequest) {
        let TablesRequest::GetUserTables { user_id, reply } = request else {
            return;
        };

        let mut user_tables = UserTables::default();
        for table in self.tables.values() {
            if table.player_index(user_id).is_some() {
                user_tables.playing.push(table.id);
            }
            if table.spectator_index(user_id).is_some() {
                user_tables.spectating.push(table.id);
            }
        }
        let _ = reply.send(user_tables);
    }

    fn get_snapshot(&mut self, request: TablesRequest) {
        if let TablesRequest::GetSnapshot { table_id, reply } = request {
            let snapshot = self
                .tables
                .get(&table_id)
                .and_then(|table| table.game.as_ref())
                .map(Game::snapshot);
            let _ = reply.send(snapshot);
        }
    }

    fn print(&mut self, _request: TablesRequest) {
        info!("{} table(s):", self.tables.len());
        for table in self.tables.values() {
            let state = match &table.game {
                Some(game) => format!("{:?}", game.status()),
                None => "pregame".to_string(),
            };
            info!(
                "  #{} \"{}\" - {} player(s), {} spectator(s), {state}",
                table.id,
                table.name,
                table.players.len(),
                table.spectators.len()
            );
        }
    }
}

/// Hash a table password on the blocking pool.
async fn hash_off_worker(password: String) -> TableResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| TableError::PasswordHash(e.to_string()))?
}

/// Check a password against a table's hash on the blocking pool.
async fn verify_off_worker(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .unwrap_or(false)
}

impl Manager<Tables> {
    /// Create a table. A password is hashed before the request is queued.
    pub async fn new_table(
        &self,
        owner: SessionData,
        mut options: TableOptions,
    ) -> ManagerResult<TableResult<TableId>> {
        let password = options.password.take();
        let password_hash = match password.as_deref().map(str::trim) {
            Some(password) if !password.is_empty() => {
                match hash_off_worker(password.to_string()).await {
                    Ok(hash) => Some(hash),
                    Err(e) => return Ok(Err(e)),
                }
            }
            _ => None,
        };

        self.request(|reply| TablesRequest::NewTable {
            owner,
            options,
            password_hash,
            reply,
        })
        .await
    }

    /// Join a table. For a password table the hash is fetched first and
    /// checked here, outside the worker.
    pub async fn join(
        &self,
        user: SessionData,
        table_id: TableId,
        password: Option<String>,
    ) -> ManagerResult<TableResult<Vec<String>>> {
        let hash = self
            .request(|reply| TablesRequest::GetPasswordHash { table_id, reply })
            .await?;
        let password_hash = match (hash, password) {
            (Some(hash), Some(password)) => {
                if verify_off_worker(password, hash.clone()).await {
                    Some(hash)
                } else {
                    None
                }
            }
            _ => None,
        };

        self.request(|reply| TablesRequest::Join {
            user,
            table_id,
            password_hash,
            reply,
        })
        .await
    }

    pub async fn leave(&self, user: SessionData, table_id: TableId) -> ManagerResult<TableResult<()>> {
        self.request(|reply| TablesRequest::Leave {
            user,
            table_id,
            reply,
        })
        .await
    }

    pub async fn spectate(
        &self,
        user: SessionData,
        table_id: TableId,
    ) -> ManagerResult<TableResult<TableDescription>> {
        self.request(|reply| TablesRequest::Spectate {
            user,
            table_id,
            reply,
        })
        .await
    }

    pub async fn unspectate(
        &self,
        user: SessionData,
        table_id: TableId,
    ) -> ManagerResult<TableResult<()>> {
        self.request(|reply| TablesRequest::Unspectate {
            user,
            table_id,
            reply,
        })
        .await
    }

    pub async fn new_replay(
        &self,
        user: SessionData,
        record: GameRecord,
    ) -> ManagerResult<TableResult<TableId>> {
        self.request(|reply| TablesRequest::NewReplay {
            user,
            record,
            reply,
        })
        .await
    }

    pub async fn start_game(
        &self,
        user: SessionData,
        table_id: TableId,
    ) -> ManagerResult<TableResult<()>> {
        self.request(|reply| TablesRequest::StartGame {
            user,
            table_id,
            reply,
        })
        .await
    }

    pub async fn act(
        &self,
        user: SessionData,
        table_id: TableId,
        action: TableAction,
    ) -> ManagerResult<TableResult<()>> {
        self.request(|reply| TablesRequest::Action {
            user,
            table_id,
            action,
            reply,
        })
        .await
    }

    pub async fn hypothetical(
        &self,
        user: SessionData,
        table_id: TableId,
        op: HypotheticalOp,
    ) -> ManagerResult<TableResult<()>> {
        self.request(|reply| TablesRequest::Hypothetical {
            user,
            table_id,
            op,
            reply,
        })
        .await
    }

    pub async fn tag(
        &self,
        user: SessionData,
        table_id: TableId,
        tag: String,
        remove: bool,
    ) -> ManagerResult<TableResult<String>> {
        self.request(|reply| TablesRequest::Tag {
            user,
            table_id,
            tag,
            remove,
            reply,
        })
        .await
    }

    pub async fn chat(
        &self,
        user: SessionData,
        table_id: TableId,
        msg: String,
    ) -> ManagerResult<TableResult<()>> {
        self.request(|reply| TablesRequest::Chat {
            user,
            table_id,
            msg,
            reply,
        })
        .await
    }

    pub async fn chat_typing(
        &self,
        user: SessionData,
        table_id: TableId,
        typing: bool,
    ) -> ManagerResult<TableResult<()>> {
        self.request(|reply| TablesRequest::ChatTyping {
            user,
            table_id,
            typing,
            reply,
        })
        .await
    }

    pub async fn note(
        &self,
        user: SessionData,
        table_id: TableId,
        order: usize,
        note: String,
    ) -> ManagerResult<TableResult<()>> {
        self.request(|reply| TablesRequest::Note {
            user,
            table_id,
            order,
            note,
            reply,
        })
        .await
    }

    pub async fn restore(&self, archived: ArchivedTable) -> ManagerResult<TableResult<TableId>> {
        self.request(|reply| TablesRequest::Restore {
            archived: Box::new(archived),
            reply,
        })
        .await
    }

    pub fn disconnect_user(&self, user_id: UserId) -> ManagerResult<()> {
        self.submit(TablesRequest::DisconnectUser { user_id })
    }

    pub fn idle_sweep(&self) -> ManagerResult<()> {
        self.submit(TablesRequest::IdleSweep)
    }

    pub async fn get_table(&self, table_id: TableId) -> ManagerResult<Option<TableDescription>> {
        self.request(|reply| TablesRequest::GetTable { table_id, reply })
            .await
    }

    pub async fn get_tables(&self) -> ManagerResult<Vec<TableDescription>> {
        self.request(|reply| TablesRequest::GetTables { reply }).await
    }

    pub async fn get_user_tables(&self, user_id: UserId) -> ManagerResult<UserTables> {
        self.request(|reply| TablesRequest::GetUserTables { user_id, reply })
            .await
    }

    pub async fn get_snapshot(&self, table_id: TableId) -> ManagerResult<Option<GameSnapshot>> {
        self.request(|reply| TablesRequest::GetSnapshot { table_id, reply })
            .await
    }
}
