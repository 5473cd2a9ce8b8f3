//! Built-in agent presets: goals, actions and a default task

use clap::ValueEnum;
use datagent_core::data_actions;
use datagent_core::{Action, ActionRegistry, Goal, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresetKind {
    /// Summarize every data file in the data directory
    Describe,
    /// Alias-based QA deep dive comparing previous and current data
    Analyst,
    /// Path-based QA comparison of two file versions
    Qa,
    /// Terminate immediately (smoke test)
    Terminate,
}

pub struct Preset {
    pub goals: Vec<Goal>,
    pub registry: ActionRegistry,
    pub task: &'static str,
}

impl PresetKind {
    pub fn build(self) -> Result<Preset> {
        match self {
            PresetKind::Describe => Ok(Preset {
                goals: describer_goals(),
                registry: registry(vec![
                    data_actions::list_files()?,
                    data_actions::list_column_names_of_dataframe()?,
                    data_actions::describe_dataframe()?,
                    data_actions::show_datatype_of_column()?,
                    data_actions::describe_column()?,
                ])?,
                task: DESCRIBE_TASK,
            }),
            PresetKind::Analyst => Ok(Preset {
                goals: analyst_goals(),
                registry: registry(vec![
                    data_actions::list_files()?,
                    data_actions::load_dataframe()?,
                    data_actions::call_dataframe_method()?,
                    data_actions::call_column_method()?,
                    data_actions::merge_dataframes()?,
                ])?,
                task: ANALYST_TASK,
            }),
            PresetKind::Qa => Ok(Preset {
                goals: qa_goals(),
                registry: registry(vec![
                    data_actions::list_files()?,
                    data_actions::describe_dataframe()?,
                    data_actions::show_datatype_of_column()?,
                    data_actions::describe_column()?,
                    data_actions::compare_similarity_column_joined_on_key()?,
                ])?,
                task: QA_TASK,
            }),
            PresetKind::Terminate => Ok(Preset {
                goals: vec![Goal::new(
                    1,
                    "Terminate",
                    "Call the terminate call directly, and close off with a joke.",
                )],
                registry: ActionRegistry::new(),
                task: DESCRIBE_TASK,
            }),
        }
    }
}

fn registry(actions: Vec<Action>) -> Result<ActionRegistry> {
    let mut registry = ActionRegistry::new();
    for action in actions {
        registry.register(action)?;
    }
    Ok(registry)
}

fn describer_goals() -> Vec<Goal> {
    vec![
        Goal::new(
            1,
            "Gather Information",
            "Giving a summary of all data present in the data directory, \
             by listing all files in the directory, and describing the dataframes. ",
        ),
        Goal::new(
            1,
            "Terminate",
            "Call the terminate call when you have descriptions of all dataframes, \
             or when there is an indication that the file loading is unsuccessful or you run into other problems.",
        ),
    ]
}

fn analyst_goals() -> Vec<Goal> {
    vec![
        Goal::new(
            1,
            "Gather Information",
            "
    - Find the latest and the previous SBTI target file in data, by listing all data files.
    - By loading the data frame and assigning it an alias, you can access it.
    - Gather high-level statistics like size, number of columns, column names, of the dataframes.
    ",
        ),
        Goal::new(
            1,
            "Do a deep-dive in the columns to give a high-quality QA report",
            "
    - Based on the information gathered, do a deep dive on the changes in the data
    - It is essential that any larger changes are spotted and reported
    - Larger changes (exceeding a few percent) need flagging by a WARNING.
    - Note that previous and latest data is best compared by merging on the \"sbti_id\" column
    - Standard functions at your disposal: \"describe\", \"mean\", \"max\", \"min\", etc.
    - Continue searching for changes until you have a complete analysis of all changes.
    ",
        ),
        Goal::new(
            1,
            "Terminate",
            "Call the terminate function only when you have gathered all information \
             and the column-wise deep dive. \
             Most importantly: give a highly structured and extensive summary of the observations",
        ),
    ]
}

fn qa_goals() -> Vec<Goal> {
    vec![
        Goal::new(
            1,
            "Gather Information",
            "
    - Find the latest SBTI target file in data, and the previous one, by listing all data files.
    - Get the principle characteristics of both files, such as the file size, the number of rows and columns, and main statistics of the columns
    - Summarize the main differences between both files
    ",
        ),
        Goal::new(
            1,
            "Do a column-wise deep-dive",
            "
    - For columns where changes are seen, compare the similarity and difference between columns in the previous and new (current) file
    - Highlight changes when they exceed a few %, by explicitly flagging these as WARNINGS!
    ",
        ),
        Goal::new(
            1,
            "Terminate",
            "Call the terminate call when you have found the two SBTI files, \
             or when there is an indication that the file loading is unsuccessful or you run into other problems.",
        ),
    ]
}

const DESCRIBE_TASK: &str = "Describe the data in this directory.";

const QA_TASK: &str = "Describe the data in the directory, \
    report a summary of the difference between the previous and newest (current) files. \
    and investigate the similarity and changes of columns (after joining on common key)";

const ANALYST_TASK: &str = r#"
You are an AI agent that can perform tasks by using available tools to answer questions about files
present in the environment.

Your workflow is:
1. Read the user request carefully.
2. Execute the right dataframe tool(s) to obtain the necessary information. Multiple calls are needed.
3. After gathering the required information, analyze the results directly (do not terminate yet).
4. Formulate a clear, concise, and human-interpretable summary/answer based on the results.
5. ONLY after you have the complete summary/answer, call the "terminate" tool ONCE with the full
   answer in its 'message' field.

Rules:
- Do NOT call "terminate" until you have the full final answer ready.
- Do NOT drop or omit the analysis results. The entire human-facing explanation must be included
  in the terminate message.
- If you are unsure or need more information, make additional tool calls instead of terminating
  early.

- Your terminate message must always follow this structure:

  Summary:
  <Plain-language explanation of the findings. Clearly answer the user's question.>

  Key Results:
  - <Specific value(s) or statistics computed>
  - <Any notable comparisons, anomalies, or patterns>
  - <References to relevant columns or subsets used>

  Notes:
  <Optional section for caveats, assumptions, or next steps if more analysis is needed.>
"#;
