//! Random sequences of user intents against a live session. After every
//! step the displayed path must still be a contiguous root-to-node walk and
//! no previously displayed message may have disappeared.

mod common;

use std::collections::HashSet;
use std::future::Future;

use common::{Server, harness, ok};
use proptest::prelude::*;
use proptest::sample::Index;
use twig_core::{
    ChatSession, DEFAULT_ERROR_MESSAGE, Direction, SessionConfig, SessionError, SessionStatus,
    TurnOutcome,
};
use twig_llm::Error;
use twig_tree::{NodeId, Role, Tree};

#[derive(Debug, Clone)]
enum Step {
    Submit,
    SubmitFailing,
    SubmitStopped,
    Edit(Index),
    Regenerate(Index),
    Navigate(Index, bool),
    Clear,
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => Just(Step::Submit),
        1 => Just(Step::SubmitFailing),
        1 => Just(Step::SubmitStopped),
        2 => any::<Index>().prop_map(Step::Edit),
        2 => any::<Index>().prop_map(Step::Regenerate),
        3 => (any::<Index>(), any::<bool>()).prop_map(|(i, next)| Step::Navigate(i, next)),
        1 => Just(Step::Clear),
    ]
}

#[derive(Clone, Copy)]
enum Reply {
    Answer,
    Fail,
    Stop,
}

/// Run an intent to completion. If it issues a request, settle that
/// request according to `reply`.
async fn settle<F>(
    session: &ChatSession,
    server: &mut Server,
    intent: F,
    reply: Reply,
) -> Result<TurnOutcome, SessionError>
where
    F: Future<Output = Result<TurnOutcome, SessionError>>,
{
    tokio::pin!(intent);
    tokio::select! {
        biased;
        result = &mut intent => return result,
        call = server.next_call() => match reply {
            Reply::Answer => {
                let _ = call.reply.send(ok("reply"));
            }
            Reply::Fail => {
                let _ = call.reply.send(Err(Error::Api {
                    status: 503,
                    message: "overloaded".into(),
                }));
            }
            Reply::Stop => {
                session.stop();
                drop(call);
            }
        },
    }
    intent.await
}

fn assert_well_formed(tree: &Tree) {
    assert!(
        tree.with_selected_path(tree.selected_path().to_vec()).is_ok(),
        "selected path is contiguous"
    );
    for node in tree.nodes() {
        for child in &node.children_ids {
            assert_eq!(tree.get(*child).and_then(|c| c.parent_id), Some(node.id));
        }
        match node.parent_id {
            Some(parent) => assert!(tree.get(parent).unwrap().children_ids.contains(&node.id)),
            None => assert!(tree.root_ids().contains(&node.id)),
        }
    }
}

async fn apply(
    session: &ChatSession,
    server: &mut Server,
    step: &Step,
    counter: &mut usize,
) {
    *counter += 1;
    let text = format!("message {counter}");
    let before = session.tree();

    match step {
        Step::Submit => {
            let outcome = settle(session, server, session.submit(text, Vec::new()), Reply::Answer)
                .await
                .unwrap();
            assert!(matches!(outcome, TurnOutcome::Completed { .. }));
        }
        Step::SubmitFailing => {
            let outcome = settle(session, server, session.submit(text, Vec::new()), Reply::Fail)
                .await
                .unwrap();
            let TurnOutcome::Failed { assistant_id, .. } = outcome else {
                panic!("expected failure, got {outcome:?}");
            };
            assert_eq!(session.tree().get(assistant_id).unwrap().content, DEFAULT_ERROR_MESSAGE);
        }
        Step::SubmitStopped => {
            let outcome = settle(session, server, session.submit(text, Vec::new()), Reply::Stop)
                .await
                .unwrap();
            let TurnOutcome::Cancelled { user_id } = outcome else {
                panic!("expected cancellation, got {outcome:?}");
            };
            let tree = session.tree();
            assert_eq!(tree.len(), before.len() + 1, "only the user node was added");
            assert_eq!(tree.leaf(), Some(user_id));
        }
        Step::Edit(ix) => {
            let users: Vec<NodeId> = session
                .messages()
                .iter()
                .filter(|m| m.role() == Role::User)
                .map(|m| m.id())
                .collect();
            if users.is_empty() {
                return;
            }
            let original = users[ix.index(users.len())];
            let outcome = settle(
                session,
                server,
                session.edit_and_resubmit(original, text),
                Reply::Answer,
            )
            .await
            .unwrap();
            let TurnOutcome::Completed { user_id, .. } = outcome else {
                panic!("expected completion, got {outcome:?}");
            };
            let tree = session.tree();
            assert!(tree.contains(original));
            assert!(!tree.selected_path().contains(&original));
            assert!(tree.sibling_at_offset(user_id, -1).is_some());
        }
        Step::Regenerate(ix) => {
            let len = before.selected_path().len();
            if len == 0 {
                return;
            }
            let index = ix.index(len);
            match settle(session, server, session.regenerate(index), Reply::Answer).await {
                Ok(TurnOutcome::Completed {
                    user_id,
                    assistant_id,
                }) => {
                    let tree = session.tree();
                    assert_eq!(tree.get(assistant_id).unwrap().parent_id, Some(user_id));
                    assert_eq!(tree.leaf(), Some(assistant_id));
                    assert_eq!(
                        tree.get(user_id).unwrap().children_ids.len(),
                        before.get(user_id).unwrap().children_ids.len() + 1
                    );
                }
                Err(SessionError::NotRegenerable { .. }) => {
                    assert_eq!(session.tree().selected_path(), before.selected_path());
                }
                other => panic!("unexpected regenerate result: {other:?}"),
            }
        }
        Step::Navigate(ix, next) => {
            let path = before.selected_path();
            if path.is_empty() {
                return;
            }
            let id = path[ix.index(path.len())];
            let (there, back) = if *next {
                (Direction::Next, Direction::Previous)
            } else {
                (Direction::Previous, Direction::Next)
            };
            match session.navigate_message(id, there).unwrap() {
                Some(sibling) => {
                    assert!(session.tree().selected_path().contains(&sibling));
                    assert_eq!(session.navigate_message(sibling, back).unwrap(), Some(id));
                    assert!(session.tree().selected_path().contains(&id));
                }
                None => assert_eq!(session.tree().selected_path(), path),
            }
        }
        Step::Clear => session.clear_chat(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_intent_leaves_a_contiguous_path(steps in prop::collection::vec(arb_step(), 1..24)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        runtime.block_on(async {
            let config = SessionConfig::default().system_prompt("You are twig.");
            let (session, mut server) = harness(config);
            let mut seen: HashSet<NodeId> = HashSet::new();
            let mut counter = 0;

            for step in &steps {
                apply(&session, &mut server, step, &mut counter).await;

                let tree = session.tree();
                assert_eq!(session.status(), SessionStatus::Idle);
                assert_well_formed(&tree);

                if matches!(step, Step::Clear) {
                    seen.clear();
                }
                assert!(
                    seen.iter().all(|id| tree.contains(*id)),
                    "messages are never deleted"
                );
                seen.extend(tree.selected_path().iter().copied());
            }
        });
    }
}
