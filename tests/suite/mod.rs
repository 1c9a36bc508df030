mod console_flow;
mod registry_flow;
mod schedule_flow;
