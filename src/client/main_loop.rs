// (c) 2025 Ross Younger
//! Main client event loop

use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::time::Duration;

use anstream::println;
use anyhow::Context as _;
use indicatif::{MultiProgress, ProgressBar};
use tokio::io::{AsyncBufRead, AsyncBufReadExt as _, AsyncWrite, BufReader, Lines};
use tokio::net::TcpStream;
use tracing::{debug, info, trace_span, warn, Instrument as _};

use super::adapter::{self, Inbound};
use super::dcc::DccLink;
use super::irc_session::IrcSession;
use super::progress::progress_bar_for;
use crate::cli::styles::{error, info as info_style, success, warning, RESET};
use crate::config::Configuration;
use crate::session::{Action, Event, Notice, Session, SessionSettings, Severity};

/// Sent with our QUIT
const QUIT_MESSAGE: &str = "bookz signing off";

/// What the loop is waiting on
enum Input {
    Server(Option<crate::protocol::irc::Message>),
    Stream(std::io::Result<Option<Vec<u8>>>),
    Operator(std::io::Result<Option<String>>),
}

/// The outcome of performing one action
enum Step {
    Done,
    /// The action failed in a way the session needs to hear about
    FollowUp(Event),
    Stop,
}

/// Everything the loop owns
struct Client<R, W> {
    irc: IrcSession<R, W>,
    session: Session,
    link: Option<DccLink>,
    bar: Option<ProgressBar>,
    display: MultiProgress,
    connect_timeout: Duration,
    quiet: bool,
}

/// Waits for the next chunk on the transfer stream, if there is one
async fn next_chunk(link: &mut Option<DccLink>) -> std::io::Result<Option<Vec<u8>>> {
    match link {
        Some(l) => l.read_chunk().await,
        None => std::future::pending().await,
    }
}

impl<R, W> Client<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Runs until the server goes away, or the operator has closed their input and the session is at rest
    async fn run<O>(&mut self, mut operator: Lines<O>) -> anyhow::Result<bool>
    where
        O: AsyncBufRead + Unpin,
    {
        let mut operator_open = true;
        loop {
            if !operator_open && self.session.is_settled() && !self.session.auto_search_pending() {
                debug!("operator input closed and nothing in flight; leaving");
                let _ = self
                    .irc
                    .quit(QUIT_MESSAGE)
                    .await
                    .inspect_err(|e| debug!("sending QUIT: {e}"));
                return Ok(true);
            }

            let input = tokio::select! {
                msg = self.irc.read_message() => Input::Server(msg.context("reading from server")?),
                chunk = next_chunk(&mut self.link) => Input::Stream(chunk),
                line = operator.next_line(), if operator_open => Input::Operator(line),
            };

            let event = match input {
                Input::Server(None) => {
                    if !self.irc.is_registered() {
                        anyhow::bail!("the server closed the connection before we registered");
                    }
                    warn!("the server closed the connection");
                    adapter::translate(Inbound::Disconnected)
                }
                Input::Server(Some(msg)) => self
                    .irc
                    .handle(&msg)
                    .await?
                    .and_then(adapter::translate),
                Input::Stream(Ok(Some(bytes))) => {
                    if let Some(bar) = &self.bar {
                        bar.inc(bytes.len() as u64);
                    }
                    adapter::translate(Inbound::StreamChunk(bytes))
                }
                Input::Stream(Ok(None)) => adapter::translate(Inbound::StreamClosed),
                Input::Stream(Err(e)) => adapter::translate(Inbound::StreamFailed(e.to_string())),
                Input::Operator(Ok(Some(line))) => Some(Event::Operator(line)),
                Input::Operator(Ok(None)) => {
                    debug!("operator input closed");
                    operator_open = false;
                    None
                }
                Input::Operator(Err(e)) => {
                    warn!("reading operator input: {e}");
                    operator_open = false;
                    None
                }
            };

            if let Some(event) = event {
                if self.dispatch(event).await?.is_break() {
                    return Ok(true);
                }
            }
        }
    }

    /// Feeds an event to the session and carries out what it asks for
    async fn dispatch(&mut self, event: Event) -> anyhow::Result<ControlFlow<()>> {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            for action in self.session.handle(event) {
                match self.perform(action).await? {
                    Step::Done => (),
                    Step::FollowUp(next) => queue.push_back(next),
                    Step::Stop => return Ok(ControlFlow::Break(())),
                }
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    async fn perform(&mut self, action: Action) -> anyhow::Result<Step> {
        match action {
            Action::SendMessage { .. } | Action::RequestNames { .. } => {
                if let Some(message) = adapter::outbound(&action) {
                    self.irc.send(&message).await?;
                }
            }
            Action::OpenStream {
                address,
                file_name,
                expected_size,
                purpose,
            } => match DccLink::connect(address, self.connect_timeout).await {
                Ok(link) => {
                    self.link = Some(link);
                    self.bar = Some(progress_bar_for(
                        &self.display,
                        &file_name,
                        expected_size,
                        purpose,
                        self.quiet,
                    )?);
                }
                Err(e) => return Ok(Step::FollowUp(Event::StreamFailed(format!("{e:#}")))),
            },
            Action::Acknowledge(ack) => {
                if let Some(link) = self.link.as_mut() {
                    // The sender may close as soon as it has sent everything; that is not an error
                    if let Err(e) = link.acknowledge(ack).await {
                        debug!("acknowledgement not sent: {e}");
                    }
                }
            }
            Action::CloseStream => {
                self.link = None;
                if let Some(bar) = self.bar.take() {
                    bar.finish_and_clear();
                }
            }
            Action::Notify(notice) => self.show(&notice),
            Action::Terminate => return Ok(Step::Stop),
        }
        Ok(Step::Done)
    }

    fn show(&self, notice: &Notice) {
        let style = match notice.severity() {
            Severity::Info => info_style(),
            Severity::Warning => warning(),
            Severity::Error => error(),
            Severity::Success => success(),
        };
        self.display.suspend(|| println!("{style}{notice}{RESET}"));
    }
}

/// Main client mode event loop
///
/// Connects to the server, joins the channel and runs search cycles until the server goes away
/// or the operator closes standard input.
///
/// # Return value
/// `true` if the session ended normally.
///
// Caution: As we are using ProgressBar, anything to be printed to console should go through display.suspend() !
pub async fn client_main(
    config: &Configuration,
    display: MultiProgress,
    auto_search: Option<String>,
    quiet: bool,
) -> anyhow::Result<bool> {
    let server = format!("{}:{}", config.server, config.port);
    info!("connecting to {server}");
    let stream = tokio::time::timeout(
        config.connect_timeout_duration(),
        TcpStream::connect(&server),
    )
    .await
    .with_context(|| format!("connection to {server} timed out"))?
    .with_context(|| format!("connecting to {server}"))?;
    let (rd, wr) = stream.into_split();

    let mut irc = IrcSession::new(BufReader::new(rd), wr, &config.nickname, &config.channel);
    irc.register().await?;

    let settings = SessionSettings {
        search_command: config.search_command.clone(),
        request_style: config.request_style,
        download_dir: config.download_dir.clone(),
        auto_search,
    };
    let mut client = Client {
        irc,
        session: Session::new(&config.channel, settings),
        link: None,
        bar: None,
        display,
        connect_timeout: config.connect_timeout_duration(),
        quiet,
    };
    let operator = BufReader::new(tokio::io::stdin()).lines();
    let result = client
        .run(operator)
        .instrument(trace_span!("CLIENT"))
        .await;
    client.display.clear()?;
    result
}
