//! Participant assignment. Decides, per outgoing template message, which
//! arm the recipient belongs to and whether the message goes out.
//!
//! Only messages using one of the active study's templates take part.
//! A recipient keeps the arm they were first given. New recipients are
//! split at random while both arms have room, sent to the open arm when
//! one is full, and left unassigned once both are full.
//!
//! Control recipients never receive the message. Delivered messages to
//! test recipients are counted toward the study's message spend.

use crate::{
    clock::StudyClock,
    error::LiftResult,
    rng::AssignmentRng,
    store::StudyStore,
    study::Study,
    types::{normalize_phone, GroupName, StudyId},
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    Deliver,
    Suppress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingDecision {
    pub study_id: Option<StudyId>,
    pub group: Option<GroupName>,
    pub delivery: Delivery,
}

impl RoutingDecision {
    fn outside_study() -> Self {
        Self {
            study_id: None,
            group: None,
            delivery: Delivery::Deliver,
        }
    }
}

pub struct ParticipantRouter<'a> {
    store: &'a dyn StudyStore,
    clock: StudyClock,
    rng: &'a mut AssignmentRng,
}

impl<'a> ParticipantRouter<'a> {
    pub fn new(store: &'a dyn StudyStore, clock: StudyClock, rng: &'a mut AssignmentRng) -> Self {
        Self { store, clock, rng }
    }

    /// Route one template message to `phone_number`.
    pub fn route_message(
        &mut self,
        template_name: &str,
        phone_number: &str,
    ) -> LiftResult<RoutingDecision> {
        let Some(study_id) = self.store.active_study_id(self.clock.today())? else {
            return Ok(RoutingDecision::outside_study());
        };
        let Some(study) = self.store.study(&study_id)? else {
            return Ok(RoutingDecision::outside_study());
        };
        if !study.uses_template(template_name) {
            log::debug!("template {template_name} is not part of study {study_id}");
            return Ok(RoutingDecision::outside_study());
        }

        let phone = normalize_phone(phone_number);
        let group = match self.store.group_of(&study_id, &phone)? {
            Some(existing) => Some(existing),
            None => {
                let chosen = self.choose_group(&study);
                match chosen {
                    Some(g) => {
                        self.store.assign_to_group(&study_id, &phone, g)?;
                        log::info!("participant assigned to {g} group of study {study_id}");
                    }
                    None => log::info!("both groups of study {study_id} are full"),
                }
                chosen
            }
        };

        let delivery = match group {
            Some(GroupName::Control) => {
                log::info!("message dropped: participant in control group");
                Delivery::Suppress
            }
            Some(GroupName::Test) => {
                self.store.increment_messages_count(&study_id)?;
                Delivery::Deliver
            }
            None => Delivery::Deliver,
        };

        Ok(RoutingDecision {
            study_id: Some(study_id),
            group,
            delivery,
        })
    }

    /// Like `route_message`, but a study failure never blocks delivery.
    pub fn route_or_deliver(&mut self, template_name: &str, phone_number: &str) -> RoutingDecision {
        self.route_message(template_name, phone_number)
            .unwrap_or_else(|e| {
                log::error!("lift study routing failed, delivering anyway: {e}");
                RoutingDecision::outside_study()
            })
    }

    fn choose_group(&mut self, study: &Study) -> Option<GroupName> {
        let control_full = study.is_full(GroupName::Control);
        let test_full = study.is_full(GroupName::Test);
        match (control_full, test_full) {
            (false, false) => Some(self.rng.pick_group()),
            (true, false) => Some(GroupName::Test),
            (false, true) => Some(GroupName::Control),
            (true, true) => None,
        }
    }
}
