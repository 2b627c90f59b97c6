//! Acceptance suite for the `com.amazon.devicefarm` Tasks sample app.
//!
//! The chain builds app state incrementally: it adds two tasks, toggles the
//! older one on and off, deletes it with a left swipe and checks that only
//! the newer one is left. New tasks are inserted at the top of the list, so
//! after both additions row 1 holds "Task 2" and row 2 holds "Task 1".

use async_trait::async_trait;

use crate::driver::AutomationDriver;
use crate::element::Locator;
use crate::gesture::Direction;
use crate::runner::ScenarioContext;
use crate::scenario::{ensure_eq, ChainError, ScenarioBody, ScenarioChain, ScenarioError};

pub const HEADLINE_ID: &str = "com.amazon.devicefarm:id/tasksText";
pub const ADD_TASK_BUTTON_ID: &str = "com.amazon.devicefarm:id/fab";
pub const NEW_TASK_TEXT_ID: &str = "com.amazon.devicefarm:id/newTaskText";
pub const NEW_TASK_SUBMIT_ID: &str = "com.amazon.devicefarm:id/newTaskButton";
pub const CONFIRM_BUTTON_ID: &str = "android:id/button1";

/// Path from the window root to the task list rows.
pub const TASK_ROW_PREFIX: &str = "/hierarchy/android.widget.FrameLayout/android.widget.LinearLayout/android.widget.FrameLayout/android.view.ViewGroup/android.widget.FrameLayout/android.widget.RelativeLayout/androidx.recyclerview.widget.RecyclerView/android.widget.FrameLayout";

/// Path from a row to its checkbox.
pub const TASK_ROW_SUFFIX: &str = "/android.widget.RelativeLayout/android.widget.CheckBox";

pub const HEADLINE: &str = "Tasks";

/// Locator for the checkbox of the task at 1-based list `position`.
pub fn task_row_checkbox(position: usize) -> Locator {
    Locator::xpath(format!("{TASK_ROW_PREFIX}[{position}]{TASK_ROW_SUFFIX}"))
}

/// The headline reads [`HEADLINE`].
pub struct ExpectHeadline;

#[async_trait]
impl ScenarioBody for ExpectHeadline {
    async fn run(&self, ctx: &ScenarioContext) -> Result<(), ScenarioError> {
        let text = ctx.text(&Locator::id(HEADLINE_ID)).await?;
        ensure_eq("headline", HEADLINE, &text)?;
        Ok(())
    }
}

/// Adds a task through the new-task dialog and checks it is listed first.
pub struct AddTask {
    pub label: String,
}

impl AddTask {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[async_trait]
impl ScenarioBody for AddTask {
    async fn run(&self, ctx: &ScenarioContext) -> Result<(), ScenarioError> {
        ctx.click(&Locator::id(ADD_TASK_BUTTON_ID)).await?;
        ctx.send_keys(&Locator::id(NEW_TASK_TEXT_ID), &self.label).await?;
        ctx.click(&Locator::id(NEW_TASK_SUBMIT_ID)).await?;

        let text = ctx.text(&task_row_checkbox(1)).await?;
        ensure_eq("newest task label", &self.label, &text)?;
        Ok(())
    }
}

/// Taps a task's checkbox and checks the resulting `checked` state.
pub struct ToggleTask {
    pub position: usize,
    pub expect_checked: bool,
}

#[async_trait]
impl ScenarioBody for ToggleTask {
    async fn run(&self, ctx: &ScenarioContext) -> Result<(), ScenarioError> {
        let row = ctx.click(&task_row_checkbox(self.position)).await?;

        let checked = ctx
            .driver()
            .element_attribute(&row, "checked")
            .await?
            .unwrap_or_default();
        let expected = if self.expect_checked { "true" } else { "false" };
        ensure_eq(&format!("row {} checked", self.position), expected, &checked)?;
        Ok(())
    }
}

/// Swipes a task away to the left and confirms the delete dialog.
pub struct DeleteTask {
    pub position: usize,
}

#[async_trait]
impl ScenarioBody for DeleteTask {
    async fn run(&self, ctx: &ScenarioContext) -> Result<(), ScenarioError> {
        ctx.swipe(&task_row_checkbox(self.position), Direction::Left).await?;
        ctx.click(&Locator::id(CONFIRM_BUTTON_ID)).await?;
        Ok(())
    }
}

/// The task at `position` is labelled `label`.
pub struct ExpectTaskLabel {
    pub position: usize,
    pub label: String,
}

#[async_trait]
impl ScenarioBody for ExpectTaskLabel {
    async fn run(&self, ctx: &ScenarioContext) -> Result<(), ScenarioError> {
        let text = ctx.text(&task_row_checkbox(self.position)).await?;
        ensure_eq(&format!("row {} label", self.position), &self.label, &text)?;
        Ok(())
    }
}

/// The full Tasks chain.
pub fn chain() -> Result<ScenarioChain, ChainError> {
    ScenarioChain::builder()
        .scenario("home_page_headline", &[], ExpectHeadline)
        .scenario("add_new_task", &["home_page_headline"], AddTask::new("Task 1"))
        .scenario("add_second_new_task", &["add_new_task"], AddTask::new("Task 2"))
        .scenario(
            "complete_first_task",
            &["add_second_new_task"],
            ToggleTask {
                position: 2,
                expect_checked: true,
            },
        )
        .scenario(
            "uncomplete_first_task",
            &["complete_first_task"],
            ToggleTask {
                position: 2,
                expect_checked: false,
            },
        )
        .scenario(
            "delete_first_task",
            &["uncomplete_first_task"],
            DeleteTask { position: 2 },
        )
        .scenario(
            "remaining_task_name",
            &["delete_first_task"],
            ExpectTaskLabel {
                position: 1,
                label: "Task 2".to_string(),
            },
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_order() {
        let chain = chain().unwrap();
        assert_eq!(
            chain.names(),
            vec![
                "home_page_headline",
                "add_new_task",
                "add_second_new_task",
                "complete_first_task",
                "uncomplete_first_task",
                "delete_first_task",
                "remaining_task_name",
            ]
        );
    }

    #[test]
    fn test_task_row_checkbox() {
        let locator = task_row_checkbox(2);
        assert_eq!(locator.strategy(), "xpath");
        assert!(locator
            .value()
            .ends_with("RecyclerView/android.widget.FrameLayout[2]/android.widget.RelativeLayout/android.widget.CheckBox"));
        assert!(locator.value().starts_with("/hierarchy/android.widget.FrameLayout/"));
    }
}
