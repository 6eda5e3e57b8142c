//! Per-session chat state and the UI policies that depend on it:
//! scroll-follow, connection-gated input and message decoration.

use crate::{
    codec::DonationPayload,
    connection::{ConnectionStatus, OutboundSink},
    donation::DonationIndicatorScheduler,
    ports::{Emphasis, MessageId, RenderedMessage, UiPorts},
};

/// Chat session state
///
/// `Connected` is entered on identity assignment, not on transport open.
#[derive(Debug)]
pub struct ChatSession {
    status: ConnectionStatus,
    username: String,
    sink: Option<OutboundSink>,
    input: String,
    next_message_id: u64,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            username: String::new(),
            sink: None,
            input: String::new(),
            next_message_id: 1,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    /// Username assigned by the server; empty until the first assignment
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Current text of the chat input
    pub fn message(&self) -> &str {
        &self.input
    }

    /// Render the initial disconnected look
    pub fn start(&self, ui: &dyn UiPorts) {
        ui.set_connection_indicator(self.status);
        self.refresh_send_control(ui);
    }

    /// A connection attempt is in flight
    pub fn on_connecting(&mut self, ui: &dyn UiPorts) {
        self.sink = None;
        self.status = ConnectionStatus::Connecting;
        ui.set_connection_indicator(self.status);
        self.refresh_send_control(ui);
    }

    /// Identity assigned: install the send capability and go `Connected`
    pub fn on_assigned_username(&mut self, ui: &dyn UiPorts, username: String, sink: OutboundSink) {
        tracing::info!("Assigned username '{}'", username);
        self.username = username;
        self.sink = Some(sink);
        self.status = ConnectionStatus::Connected;

        ui.set_connection_indicator(self.status);
        self.refresh_send_control(ui);
        // History may have just been rendered.
        ui.scroll_to_bottom();
    }

    /// Append a chat line, following the bottom only if the view was there
    pub fn on_server_message(
        &mut self,
        ui: &dyn UiPorts,
        indicators: &mut DonationIndicatorScheduler,
        from: String,
        text: String,
        extra: Option<DonationPayload>,
    ) -> MessageId {
        let was_at_bottom = ui.is_scrolled_to_bottom();

        let id = MessageId(self.next_message_id);
        self.next_message_id += 1;

        let bold = text.contains(&format!("@{}", self.username));
        let emphasis = match extra {
            Some(donation) => {
                let indicator = indicators.schedule(ui, donation.amount, donation.duration, id);
                Emphasis::Donation {
                    amount: donation.amount,
                    tier: indicator.tier,
                }
            }
            None if from == self.username => Emphasis::Own,
            None => Emphasis::Plain,
        };

        ui.append_message(&RenderedMessage {
            id,
            from,
            text,
            bold,
            emphasis,
        });

        if was_at_bottom {
            ui.scroll_to_bottom();
        }
        id
    }

    /// Transport lost: drop the send capability and show the reconnecting look
    pub fn on_disconnected(&mut self, ui: &dyn UiPorts) {
        self.sink = None;
        self.status = ConnectionStatus::Disconnected;
        ui.set_connection_indicator(self.status);
        self.refresh_send_control(ui);
    }

    /// The user edited the input; the text is mirrored back to the input surface
    pub fn on_input_changed(&mut self, ui: &dyn UiPorts, text: String) {
        self.input = text;
        ui.set_input(&self.input);
        self.refresh_send_control(ui);
    }

    /// Send the current input
    ///
    /// # Returns
    ///
    /// `false` while not connected; the input is left untouched
    pub fn send_message(&mut self, ui: &dyn UiPorts) -> bool {
        if !self.is_connected() {
            return false;
        }
        let text = std::mem::take(&mut self.input);
        self.forward(ui, text)
    }

    /// Send `text` instead of the input; the input is still cleared
    pub fn send_custom_message(&mut self, ui: &dyn UiPorts, text: String) -> bool {
        if !self.is_connected() {
            return false;
        }
        self.input.clear();
        self.forward(ui, text)
    }

    /// Append `@author ` to the input and focus it
    pub fn reply_to(&mut self, ui: &dyn UiPorts, author: &str) {
        self.input.push('@');
        self.input.push_str(author);
        self.input.push(' ');
        ui.set_input(&self.input);
        ui.focus_input();
        self.refresh_send_control(ui);
    }

    pub fn clear_message(&mut self, ui: &dyn UiPorts) {
        self.input.clear();
        ui.set_input(&self.input);
        self.refresh_send_control(ui);
    }

    fn forward(&mut self, ui: &dyn UiPorts, text: String) -> bool {
        ui.set_input("");
        self.refresh_send_control(ui);

        let Some(sink) = &self.sink else {
            tracing::warn!("Connected without a send capability; dropping message");
            return false;
        };
        if let Err(e) = sink.send_chat(text) {
            tracing::warn!("Failed to send message: {}", e);
            return false;
        }
        true
    }

    fn refresh_send_control(&self, ui: &dyn UiPorts) {
        ui.set_send_enabled(self.is_connected() && !self.input.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        connection::{ConnectionManager, Endpoint, Transport},
        donation::{IndicatorId, Tier},
        error::ClientError,
        ports::{IndicatorView, MockUiPorts},
    };
    use livechat_shared::time::FixedClock;
    use mockall::predicate::eq;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingTransport {
        frames: Mutex<Vec<String>>,
    }

    impl Transport for RecordingTransport {
        fn send_text(&self, frame: String) -> Result<(), ClientError> {
            self.frames.lock().unwrap().push(frame);
            Ok(())
        }

        fn close(&self) {}

        fn is_closed(&self) -> bool {
            false
        }
    }

    fn live_sink() -> (OutboundSink, Arc<RecordingTransport>, ConnectionManager) {
        let mut connection = ConnectionManager::new(
            Endpoint {
                url: "ws://localhost/ws".to_string(),
                room: "r".to_string(),
            },
            Box::new(|| {}),
        );
        let transport = Arc::new(RecordingTransport::default());
        let attempt = connection.begin_attempt();
        connection.handle_open(attempt, transport.clone()).unwrap();
        transport.frames.lock().unwrap().clear();
        let sink = connection.sink().unwrap();
        (sink, transport, connection)
    }

    fn scheduler() -> DonationIndicatorScheduler {
        DonationIndicatorScheduler::new(Arc::new(FixedClock::new(0)))
    }

    /// Mock that accepts the control-refresh calls every transition makes.
    fn permissive_controls(ui: &mut MockUiPorts) {
        ui.expect_set_connection_indicator().return_const(());
        ui.expect_set_send_enabled().return_const(());
        ui.expect_scroll_to_bottom().return_const(());
        ui.expect_set_input().return_const(());
    }

    fn connected_session(ui: &mut MockUiPorts, username: &str) -> (ChatSession, Arc<RecordingTransport>) {
        let (sink, transport, _connection) = live_sink();
        let mut session = ChatSession::new();
        session.on_assigned_username(&*ui, username.to_string(), sink);
        (session, transport)
    }

    #[test]
    fn test_assigned_username_connects_and_gates_send_on_input() {
        // テスト項目: ユーザー名割り当て後は接続状態になり、入力が空でなくなると送信が有効になる
        // given (前提条件):
        let (sink, _transport, _connection) = live_sink();
        let mut ui = MockUiPorts::new();
        let mut seq = mockall::Sequence::new();
        ui.expect_set_connection_indicator()
            .with(eq(ConnectionStatus::Connected))
            .return_const(());
        ui.expect_scroll_to_bottom().times(1).return_const(());
        ui.expect_set_send_enabled()
            .with(eq(false))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        ui.expect_set_send_enabled()
            .with(eq(true))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        ui.expect_set_input()
            .withf(|text: &str| text == "h")
            .times(1)
            .return_const(());
        let mut session = ChatSession::new();

        // when (操作):
        session.on_assigned_username(&ui, "alice".to_string(), sink);
        session.on_input_changed(&ui, "h".to_string());

        // then (期待する結果):
        assert!(session.is_connected());
        assert_eq!(session.username(), "alice");
    }

    #[test]
    fn test_send_while_disconnected_is_noop() {
        // テスト項目: 切断中の送信はフレームを出さず、入力もクリアしない
        // given (前提条件):
        let mut ui = MockUiPorts::new();
        ui.expect_set_send_enabled()
            .with(eq(false))
            .return_const(());
        // Only the edit itself reaches the input surface.
        ui.expect_set_input()
            .withf(|text: &str| text == "hello")
            .times(1)
            .return_const(());
        let mut session = ChatSession::new();
        session.on_input_changed(&ui, "hello".to_string());

        // when (操作):
        let sent = session.send_message(&ui);
        let sent_custom = session.send_custom_message(&ui, "other".to_string());

        // then (期待する結果):
        assert!(!sent);
        assert!(!sent_custom);
        assert_eq!(session.message(), "hello");
    }

    #[test]
    fn test_send_message_clears_input_and_emits_client_message() {
        // テスト項目: 接続中の送信は入力をクリアし ClientMessage を送る
        // given (前提条件):
        let mut ui = MockUiPorts::new();
        permissive_controls(&mut ui);
        let (mut session, transport) = connected_session(&mut ui, "bob");
        session.on_input_changed(&ui, "hello".to_string());

        // when (操作):
        let sent = session.send_message(&ui);

        // then (期待する結果):
        assert!(sent);
        assert_eq!(session.message(), "");
        assert_eq!(
            *transport.frames.lock().unwrap(),
            vec![r#"{"ClientMessage":{"message":"hello"}}"#.to_string()]
        );
    }

    #[test]
    fn test_mention_is_bold_and_other_text_is_not() {
        // テスト項目: 自分の @ユーザー名 を含むメッセージは太字、含まないものは太字にならない
        // given (前提条件):
        let mut ui = MockUiPorts::new();
        permissive_controls(&mut ui);
        ui.expect_is_scrolled_to_bottom().return_const(true);
        let rendered = Arc::new(Mutex::new(Vec::new()));
        let rendered_clone = Arc::clone(&rendered);
        ui.expect_append_message()
            .returning(move |m: &RenderedMessage| rendered_clone.lock().unwrap().push(m.clone()));
        let (mut session, _transport) = connected_session(&mut ui, "bob");
        let mut indicators = scheduler();

        // when (操作):
        session.on_server_message(&ui, &mut indicators, "carol".into(), "hi @bob".into(), None);
        session.on_server_message(&ui, &mut indicators, "carol".into(), "hi bob".into(), None);
        session.on_server_message(&ui, &mut indicators, "dan".into(), "ping @bobby".into(), None);

        // then (期待する結果):
        let bold: Vec<bool> = rendered.lock().unwrap().iter().map(|m| m.bold).collect();
        // "@bobby" contains "@bob": plain substring match.
        assert_eq!(bold, vec![true, false, true]);
    }

    #[test]
    fn test_own_message_is_highlighted_unless_donation() {
        // テスト項目: 自分のメッセージは Own で装飾され、寄付付きの場合は寄付の装飾が優先される
        // given (前提条件):
        let mut ui = MockUiPorts::new();
        permissive_controls(&mut ui);
        ui.expect_is_scrolled_to_bottom().return_const(false);
        ui.expect_show_indicator().return_const(());
        let rendered = Arc::new(Mutex::new(Vec::new()));
        let rendered_clone = Arc::clone(&rendered);
        ui.expect_append_message()
            .returning(move |m: &RenderedMessage| rendered_clone.lock().unwrap().push(m.emphasis));
        let (mut session, _transport) = connected_session(&mut ui, "bob");
        let mut indicators = scheduler();
        let donation = DonationPayload {
            amount: 30_000,
            duration: 5,
        };

        // when (操作):
        session.on_server_message(&ui, &mut indicators, "bob".into(), "mine".into(), None);
        session.on_server_message(&ui, &mut indicators, "bob".into(), "paid".into(), Some(donation));
        session.on_server_message(&ui, &mut indicators, "eve".into(), "theirs".into(), None);

        // then (期待する結果):
        assert_eq!(
            *rendered.lock().unwrap(),
            vec![
                Emphasis::Own,
                Emphasis::Donation {
                    amount: 30_000,
                    tier: Tier::Warning
                },
                Emphasis::Plain,
            ]
        );
    }

    #[test]
    fn test_scroll_follows_only_when_at_bottom() {
        // テスト項目: 追加前に最下部にいた場合のみ最下部へスクロールする
        // given (前提条件):
        let mut ui = MockUiPorts::new();
        ui.expect_is_scrolled_to_bottom().times(1).return_const(false);
        ui.expect_append_message().times(1).return_const(());
        ui.expect_scroll_to_bottom().never();
        let mut session = ChatSession::new();
        let mut indicators = scheduler();

        // when (操作):
        session.on_server_message(&ui, &mut indicators, "carol".into(), "older".into(), None);

        // then (期待する結果):
        ui.checkpoint();
        ui.expect_is_scrolled_to_bottom().times(1).return_const(true);
        ui.expect_append_message().times(1).return_const(());
        ui.expect_scroll_to_bottom().times(1).return_const(());
        session.on_server_message(&ui, &mut indicators, "carol".into(), "newer".into(), None);
    }

    #[test]
    fn test_donation_schedules_linked_indicator() {
        // テスト項目: 寄付付きメッセージはそのメッセージにリンクしたインジケータを作る
        // given (前提条件):
        let mut ui = MockUiPorts::new();
        ui.expect_is_scrolled_to_bottom().return_const(true);
        ui.expect_scroll_to_bottom().return_const(());
        ui.expect_append_message().return_const(());
        ui.expect_show_indicator()
            .withf(|view: &IndicatorView| {
                view.id == IndicatorId(1)
                    && view.linked_message == MessageId(1)
                    && view.tier == Tier::Primary
                    && view.duration_secs == 10
            })
            .times(1)
            .return_const(());
        let mut session = ChatSession::new();
        let mut indicators = scheduler();

        // when (操作):
        let id = session.on_server_message(
            &ui,
            &mut indicators,
            "carol".into(),
            "hi".into(),
            Some(DonationPayload {
                amount: 5000,
                duration: 10,
            }),
        );

        // then (期待する結果):
        assert_eq!(id, MessageId(1));
        assert_eq!(indicators.active().len(), 1);
    }

    #[test]
    fn test_disconnect_disables_send_and_drops_sink() {
        // テスト項目: 切断で送信が無効化され、以後の送信は何も出さない
        // given (前提条件):
        let mut ui = MockUiPorts::new();
        permissive_controls(&mut ui);
        let (mut session, transport) = connected_session(&mut ui, "bob");
        session.on_input_changed(&ui, "pending".to_string());

        // when (操作):
        ui.checkpoint();
        ui.expect_set_connection_indicator()
            .with(eq(ConnectionStatus::Disconnected))
            .times(1)
            .return_const(());
        ui.expect_set_send_enabled()
            .with(eq(false))
            .times(1)
            .return_const(());
        session.on_disconnected(&ui);
        let sent = session.send_message(&ui);

        // then (期待する結果):
        assert!(!sent);
        assert!(!session.is_connected());
        assert_eq!(session.message(), "pending");
        assert!(transport.frames.lock().unwrap().is_empty());
    }

    #[test]
    fn test_reply_to_appends_mention_and_focuses() {
        // テスト項目: 返信は入力末尾に @名前 を追加してフォーカスする
        // given (前提条件):
        let mut ui = MockUiPorts::new();
        ui.expect_set_send_enabled().return_const(());
        ui.expect_set_input()
            .withf(|text: &str| text == "thanks ")
            .times(1)
            .return_const(());
        ui.expect_set_input()
            .withf(|text: &str| text == "thanks @carol ")
            .times(1)
            .return_const(());
        ui.expect_focus_input().times(1).return_const(());
        let mut session = ChatSession::new();
        session.on_input_changed(&ui, "thanks ".to_string());

        // when (操作):
        session.reply_to(&ui, "carol");

        // then (期待する結果):
        assert_eq!(session.message(), "thanks @carol ");
    }
}
