mod theme;

use crate::app::{
    AiToolsFocus, AiToolsScreen, AppModel, CampaignsFocus, CampaignsScreen, CustomersFocus,
    CustomersScreen, DashboardScreen, LeafColumn, LineEditor, LoginOverlay, RuleEditor, RuleRow,
    ScreenId, SegmentsFocus, SegmentsScreen, SessionState, View, flatten,
};
use crate::domain::{Campaign, ConditionGroup, Customer, format_amount};
use ratatui::prelude::*;
use ratatui::widgets::*;
use unicode_width::UnicodeWidthStr;

pub fn render(frame: &mut Frame, model: &AppModel) {
    let full_area = frame.area();
    if full_area.width == 0 || full_area.height == 0 {
        return;
    }
    frame.render_widget(Block::default().style(Style::default().bg(theme::BG)), full_area);

    render_tab_bar(frame, full_area, model);

    let content_area = if full_area.height > 2 {
        Rect {
            x: full_area.x,
            y: full_area.y.saturating_add(1),
            width: full_area.width,
            height: full_area.height.saturating_sub(2),
        }
    } else {
        full_area
    };
    let footer_area = Rect {
        x: full_area.x,
        y: full_area.y + full_area.height.saturating_sub(1),
        width: full_area.width,
        height: 1,
    };

    let area = inner_area(content_area);
    match &model.view {
        View::Dashboard(screen) => render_dashboard(frame, area, screen),
        View::Customers(screen) => render_customers(frame, area, screen),
        View::Segments(screen) => render_segments(frame, area, screen),
        View::Campaigns(screen) => render_campaigns(frame, area, screen),
        View::AiTools(screen) => render_ai_tools(frame, area, screen),
    }

    if full_area.height > 2 {
        frame.render_widget(footer_paragraph(model), footer_area);
    }

    if let Some(overlay) = &model.login {
        render_login_overlay(frame, content_area, overlay);
    }
}

fn render_tab_bar(frame: &mut Frame, area: Rect, model: &AppModel) {
    let bar_area = Rect {
        x: area.x,
        y: area.y,
        width: area.width,
        height: 1,
    };

    let base_style = Style::default().fg(theme::FG).bg(theme::BAR_BG);
    let brand_style = Style::default()
        .fg(theme::ACCENT)
        .bg(theme::BAR_BG)
        .add_modifier(Modifier::BOLD);
    let active_style = Style::default()
        .fg(theme::BG)
        .bg(theme::ACCENT)
        .add_modifier(Modifier::BOLD);
    let inactive_style = Style::default().fg(theme::MUTED).bg(theme::BAR_BG);

    let mut spans = vec![Span::styled(" MiniCRM ".to_string(), brand_style)];
    let active = model.view.id();
    for id in ScreenId::ALL {
        let label = format!(" F{} {} ", id.function_key(), id.label());
        let style = if id == active {
            active_style
        } else {
            inactive_style
        };
        spans.push(Span::styled(" ".to_string(), base_style));
        spans.push(Span::styled(label, style));
    }

    let (session_text, session_style) = if let Some(user) = model.session.user() {
        (
            user.name.clone(),
            Style::default().fg(theme::SUCCESS).bg(theme::BAR_BG),
        )
    } else if model.session.state == SessionState::Unknown {
        (
            "Checking session…".to_string(),
            Style::default().fg(theme::DIM).bg(theme::BAR_BG),
        )
    } else {
        (
            "Ctrl+L to sign in".to_string(),
            Style::default().fg(theme::MUTED).bg(theme::BAR_BG),
        )
    };
    let session_text = format!("{session_text} ");

    let used: usize = spans
        .iter()
        .map(|span| UnicodeWidthStr::width(span.content.as_ref()))
        .sum();
    let session_width = UnicodeWidthStr::width(session_text.as_str());
    let remaining = (bar_area.width as usize).saturating_sub(used);
    if remaining > session_width {
        spans.push(Span::styled(" ".repeat(remaining - session_width), base_style));
        spans.push(Span::styled(session_text, session_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).style(base_style), bar_area);
}

fn render_dashboard(frame: &mut Frame, area: Rect, screen: &DashboardScreen) {
    let block = titled_block("Dashboard");
    let Some(stats) = &screen.stats else {
        let text = match &screen.error {
            Some(error) => Line::from(Span::styled(error.clone(), error_style())),
            None => Line::from("Loading dashboard..."),
        };
        frame.render_widget(Paragraph::new(text).block(block), area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Min(0),
        ])
        .split(area);

    let name = stats
        .user
        .as_ref()
        .map(|user| user.name.as_str())
        .filter(|name| !name.trim().is_empty())
        .unwrap_or("there");
    let mut totals = vec![
        Span::styled("Customers: ", muted_style()),
        Span::raw(stats.total_customers.to_string()),
        Span::raw("   "),
        Span::styled("Campaigns: ", muted_style()),
        Span::raw(stats.total_campaigns.to_string()),
    ];
    if let Some(revenue) = stats.total_revenue {
        totals.push(Span::raw("   "));
        totals.push(Span::styled("Revenue: ", muted_style()));
        totals.push(Span::raw(format_amount(revenue)));
    }
    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            format!("Welcome back, {name}"),
            Style::default()
                .fg(theme::ACCENT)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(totals),
    ])
    .block(block);
    frame.render_widget(header, chunks[0]);

    let lists = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    let campaign_items: Vec<ListItem> = stats
        .recent_campaigns
        .iter()
        .map(|campaign| {
            ListItem::new(Line::from(vec![
                Span::raw(campaign.name.clone()),
                Span::styled(
                    format!("  audience {}", campaign.audience_count()),
                    muted_style(),
                ),
            ]))
        })
        .collect();
    frame.render_widget(
        List::new(campaign_items).block(titled_block("Recent Campaigns")),
        lists[0],
    );

    let customer_items: Vec<ListItem> = stats
        .recent_customers
        .iter()
        .map(|customer| {
            ListItem::new(Line::from(vec![
                Span::raw(customer.name.clone()),
                Span::styled(
                    format!("  {}", format_amount(customer.total_spend)),
                    muted_style(),
                ),
            ]))
        })
        .collect();
    frame.render_widget(
        List::new(customer_items).block(titled_block("Recent Customers")),
        lists[1],
    );
}

fn render_customers(frame: &mut Frame, area: Rect, screen: &CustomersScreen) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7),
            Constraint::Min(0),
        ])
        .split(area);

    let focus = screen.focus;
    let mut form = vec![
        field_line("Name", &screen.name, focus == CustomersFocus::Name),
        field_line("Email", &screen.email, focus == CustomersFocus::Email),
        field_line(
            "Total Spend",
            &screen.total_spend,
            focus == CustomersFocus::TotalSpend,
        ),
        field_line("Visits", &screen.visits, focus == CustomersFocus::Visits),
    ];
    if let Some(error) = &screen.error {
        form.push(Line::from(Span::styled(error.clone(), error_style())));
    }
    frame.render_widget(
        Paragraph::new(form).block(titled_block(if screen.busy {
            "Add Customer (saving…)"
        } else {
            "Add Customer"
        })),
        chunks[0],
    );

    let title = if screen.loading {
        "Customers (loading…)".to_string()
    } else {
        format!("Customers ({})", screen.customers.len())
    };
    render_customer_table(
        frame,
        chunks[1],
        &title,
        &screen.customers,
        (focus == CustomersFocus::Table).then_some(screen.selected),
    );
}

fn render_customer_table(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    customers: &[Customer],
    selected: Option<usize>,
) {
    let header = Row::new(["Name", "Email", "Total Spend", "Visits", "Last Purchase"])
        .style(muted_style().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = customers.iter().map(customer_row).collect();
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(22),
            Constraint::Percentage(30),
            Constraint::Percentage(16),
            Constraint::Percentage(10),
            Constraint::Percentage(22),
        ],
    )
    .header(header)
    .block(titled_block(title))
    .row_highlight_style(
        Style::default()
            .fg(theme::ACCENT)
            .bg(theme::ACCENT_BG)
            .add_modifier(Modifier::BOLD),
    );

    let mut state = TableState::default();
    if !customers.is_empty() {
        state.select(selected.map(|index| index.min(customers.len() - 1)));
    }
    frame.render_stateful_widget(table, area, &mut state);
}

fn customer_row(customer: &Customer) -> Row<'static> {
    Row::new([
        customer.name.clone(),
        customer.email.clone(),
        format_amount(customer.total_spend),
        customer.visits.to_string(),
        customer.last_purchase_label(),
    ])
}

fn render_segments(frame: &mut Frame, area: Rect, screen: &SegmentsScreen) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[0]);

    let rules_focused = screen.focus == SegmentsFocus::Rules;
    render_rule_tree(
        frame,
        top[0],
        "Segment Rules",
        &screen.rules,
        &screen.rule_editor,
        rules_focused,
    );

    let json: Vec<Line> = screen
        .rules_json()
        .lines()
        .map(|line| Line::from(line.to_string()))
        .collect();
    frame.render_widget(
        Paragraph::new(json)
            .style(muted_style())
            .block(titled_block("Generated JSON Rules")),
        top[1],
    );

    let results_focused = screen.focus == SegmentsFocus::Results;
    match (&screen.result, &screen.error) {
        (Some(result), _) => {
            let title = format!("Audience Size: {}", result.audience_size);
            render_customer_table(
                frame,
                chunks[1],
                &title,
                &result.data,
                results_focused.then_some(screen.selected),
            );
        }
        (None, Some(error)) => frame.render_widget(
            Paragraph::new(Span::styled(error.clone(), error_style()))
                .block(focus_block("Audience", results_focused)),
            chunks[1],
        ),
        (None, None) => {
            let text = if screen.busy {
                "Evaluating…"
            } else {
                "Press Ctrl+S to evaluate the segment."
            };
            frame.render_widget(
                Paragraph::new(text)
                    .style(muted_style())
                    .block(focus_block("Audience", results_focused)),
                chunks[1],
            );
        }
    }
}

fn render_campaigns(frame: &mut Frame, area: Rect, screen: &CampaignsScreen) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(0)])
        .split(columns[0]);

    let focus = screen.focus;
    frame.render_widget(
        Paragraph::new(vec![
            field_line("Name", &screen.name, focus == CampaignsFocus::Name),
            field_line(
                "Description",
                &screen.description,
                focus == CampaignsFocus::Description,
            ),
            field_line("Message", &screen.body, focus == CampaignsFocus::Message),
            field_line(
                "Scheduled",
                &screen.scheduled_date,
                focus == CampaignsFocus::ScheduledDate,
            ),
        ])
        .block(titled_block(if screen.busy {
            "New Campaign (working…)"
        } else {
            "New Campaign"
        })),
        left[0],
    );

    let rules_focused = focus == CampaignsFocus::Rules;
    render_rule_tree(
        frame,
        left[1],
        "Audience Rules",
        &screen.rules,
        &screen.rule_editor,
        rules_focused,
    );

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Percentage(55),
            Constraint::Min(0),
        ])
        .split(columns[1]);

    let status = match (&screen.error, &screen.message) {
        (Some(error), _) => Line::from(Span::styled(error.clone(), error_style())),
        (None, Some(message)) => Line::from(Span::styled(
            message.clone(),
            Style::default().fg(theme::SUCCESS),
        )),
        (None, None) => Line::from(""),
    };
    frame.render_widget(Paragraph::new(status), right[0]);

    let list_focused = focus == CampaignsFocus::List;
    let items: Vec<ListItem> = screen.campaigns.iter().map(campaign_list_item).collect();
    let title = if screen.loading {
        "Campaigns (loading…)".to_string()
    } else {
        format!("Campaigns ({})", screen.campaigns.len())
    };
    let list = List::new(items)
        .block(focus_block(&title, list_focused))
        .highlight_style(
            Style::default()
                .fg(theme::ACCENT)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    let mut state = ListState::default();
    if !screen.campaigns.is_empty() && list_focused {
        state.select(Some(screen.selected.min(screen.campaigns.len() - 1)));
    }
    frame.render_stateful_widget(list, right[1], &mut state);

    let results = screen
        .selected_campaign()
        .and_then(|campaign| screen.delivery_results.get(&campaign.id));
    let delivery_lines: Vec<Line> = match results {
        Some(results) => results
            .iter()
            .map(|result| {
                let status_style = match result.status {
                    crate::domain::DeliveryStatus::Sent => Style::default().fg(theme::SUCCESS),
                    crate::domain::DeliveryStatus::Failed => error_style(),
                };
                Line::from(vec![
                    Span::styled(format!("{:<6} ", result.status.label()), status_style),
                    Span::raw(format!("{}: ", result.customer_name)),
                    Span::styled(result.personalized_message.clone(), muted_style()),
                ])
            })
            .collect(),
        None => vec![Line::from(Span::styled(
            "No deliveries yet. Press Enter on a campaign to deliver.",
            muted_style(),
        ))],
    };
    frame.render_widget(
        Paragraph::new(delivery_lines)
            .wrap(Wrap { trim: false })
            .block(titled_block("Delivery Results")),
        right[2],
    );
}

fn campaign_list_item(campaign: &Campaign) -> ListItem<'static> {
    let scheduled = campaign
        .scheduled_date
        .as_deref()
        .filter(|date| !date.trim().is_empty())
        .unwrap_or("unscheduled");
    let mut lines = vec![Line::from(campaign.name.clone())];
    if !campaign.description.trim().is_empty() {
        lines.push(Line::from(Span::styled(
            format!("  {}", single_line(&campaign.description)),
            muted_style(),
        )));
    }
    lines.push(Line::from(Span::styled(
        format!("  Message: {}", single_line(&campaign.message)),
        muted_style(),
    )));
    lines.push(Line::from(Span::styled(
        format!(
            "  audience {} · sent {} · failed {} · {}",
            campaign.audience_count(),
            campaign.messages_sent,
            campaign.messages_failed,
            scheduled
        ),
        muted_style(),
    )));
    ListItem::new(lines)
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render_ai_tools(frame: &mut Frame, area: Rect, screen: &AiToolsScreen) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(0)])
        .split(area);

    let mut form = vec![
        field_line(
            "Campaign Objective",
            &screen.objective,
            screen.focus == AiToolsFocus::Objective,
        ),
        field_line(
            "Audience Type",
            &screen.audience,
            screen.focus == AiToolsFocus::Audience,
        ),
    ];
    if let Some(error) = &screen.error {
        form.push(Line::from(Span::styled(error.clone(), error_style())));
    }
    frame.render_widget(
        Paragraph::new(form).block(titled_block("AI Message Suggestions")),
        chunks[0],
    );

    let lines: Vec<Line> = if screen.loading {
        vec![Line::from("Generating...")]
    } else {
        screen
            .suggestions
            .iter()
            .enumerate()
            .map(|(index, suggestion)| {
                Line::from(vec![
                    Span::styled(format!("{}. ", index + 1), muted_style()),
                    Span::raw(suggestion.clone()),
                ])
            })
            .collect()
    };
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(titled_block("Suggestions")),
        chunks[1],
    );
}

fn render_login_overlay(frame: &mut Frame, area: Rect, overlay: &LoginOverlay) {
    let popup = centered_rect(72, 40, area);
    frame.render_widget(Clear, popup);

    let text = vec![
        Line::from("Open this address in a browser and sign in with Google:"),
        Line::from(Span::styled(
            overlay.login_url.clone(),
            Style::default().fg(theme::ACCENT),
        )),
        Line::from(""),
        Line::from("Then paste the session cookie (connect.sid) below."),
        Line::from(""),
        field_line("Cookie", &overlay.cookie, true),
        Line::from(""),
        Line::from(Span::styled(
            "Enter=sign in  Ctrl+V=paste  Esc=cancel",
            muted_style(),
        )),
    ];
    let paragraph = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .style(Style::default().bg(theme::SURFACE))
        .block(titled_block("Sign in"));
    frame.render_widget(paragraph, popup);
}

/// One display line per tree row. The row under the cursor is highlighted
/// when the tree has focus; on a leaf the active column is emphasized.
fn render_rule_tree(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    rules: &ConditionGroup,
    editor: &RuleEditor,
    focused: bool,
) {
    let lines = rule_tree_lines(rules, editor, focused);
    let height = usize::from(area.height.saturating_sub(2));
    let offset = rule_tree_scroll(editor.cursor.min(lines.len().saturating_sub(1)), height);
    frame.render_widget(
        Paragraph::new(lines)
            .block(focus_block(title, focused))
            .scroll((u16::try_from(offset).unwrap_or(u16::MAX), 0)),
        area,
    );
}

/// First visible row so that `cursor` stays on the last visible line once
/// the tree is taller than the panel.
fn rule_tree_scroll(cursor: usize, height: usize) -> usize {
    if height == 0 {
        return cursor;
    }
    (cursor + 1).saturating_sub(height)
}

fn rule_tree_lines(
    rules: &ConditionGroup,
    editor: &RuleEditor,
    focused: bool,
) -> Vec<Line<'static>> {
    let cursor_style = Style::default().bg(theme::ACCENT_BG);
    let column_style = Style::default()
        .fg(theme::ACCENT)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED);

    flatten(rules)
        .into_iter()
        .enumerate()
        .map(|(row_index, row)| {
            let on_cursor = focused && row_index == editor.cursor;
            let indent = "  ".repeat(row.depth().saturating_sub(1));
            let mut spans = vec![Span::raw(indent)];
            match &row {
                RuleRow::Group { path, logic } => {
                    spans.push(Span::styled(
                        format!("[{}]", logic.label()),
                        Style::default()
                            .fg(theme::ACCENT)
                            .add_modifier(Modifier::BOLD),
                    ));
                    spans.push(Span::raw(" group"));
                    if !path.is_empty() {
                        spans.push(Span::styled("  (Remove Group: Del)", dim_style()));
                    }
                }
                RuleRow::Condition { condition, .. } => {
                    let active = |column: LeafColumn| on_cursor && editor.column == column;
                    let pick = |column: LeafColumn, base: Style| {
                        if active(column) { column_style } else { base }
                    };
                    let operator_base = if condition.operator_is_valid() {
                        Style::default().fg(theme::FG)
                    } else {
                        error_style()
                    };
                    spans.push(Span::raw("• "));
                    spans.push(Span::styled(
                        condition.field.label().to_string(),
                        pick(LeafColumn::Field, Style::default().fg(theme::FG)),
                    ));
                    spans.push(Span::raw(" "));
                    spans.push(Span::styled(
                        condition.operator.clone(),
                        pick(LeafColumn::Operator, operator_base),
                    ));
                    spans.push(Span::raw(" "));
                    spans.push(Span::styled(
                        format!("[{}]", condition.value),
                        pick(LeafColumn::Value, Style::default().fg(theme::FG)),
                    ));
                    if !condition.operator_is_valid() {
                        spans.push(Span::styled("  invalid operator", error_style()));
                    }
                }
                RuleRow::AddCondition { .. } => {
                    spans.push(Span::styled("+ Condition", dim_style()));
                }
                RuleRow::AddGroup { .. } => {
                    spans.push(Span::styled("+ Group", dim_style()));
                }
            }
            let line = Line::from(spans);
            if on_cursor {
                line.style(cursor_style)
            } else {
                line
            }
        })
        .collect()
}

fn field_line(label: &str, editor: &LineEditor, focused: bool) -> Line<'static> {
    let label_style = if focused {
        Style::default()
            .fg(theme::ACCENT)
            .add_modifier(Modifier::BOLD)
    } else {
        muted_style()
    };
    let mut spans = vec![Span::styled(format!("{label}: "), label_style)];
    if focused {
        let split = editor
            .text
            .char_indices()
            .nth(editor.cursor_col)
            .map(|(idx, _)| idx)
            .unwrap_or(editor.text.len());
        let (before, after) = editor.text.split_at(split);
        spans.push(Span::raw(before.to_string()));
        spans.push(Span::styled(
            "▏".to_string(),
            Style::default().fg(theme::ACCENT),
        ));
        spans.push(Span::raw(after.to_string()));
    } else {
        spans.push(Span::raw(editor.text.clone()));
    }
    Line::from(spans)
}

fn footer_paragraph(model: &AppModel) -> Paragraph<'static> {
    let screen_hint = match &model.view {
        View::Dashboard(_) => "",
        View::Customers(_) => "Tab=next field  Ctrl+S=add  Del=delete row",
        View::Segments(_) => {
            "↑/↓=move  ←/→=column  Enter=cycle/add  Del=remove  Ctrl+S=evaluate  Ctrl+Y=copy JSON"
        }
        View::Campaigns(_) => "Tab=next field  Ctrl+S=create  Enter=deliver",
        View::AiTools(_) => "Tab=switch field  Enter=generate",
    };
    let mut base = String::new();
    if !screen_hint.is_empty() {
        base.push_str(screen_hint);
        base.push_str("  ·  ");
    }
    base.push_str("F1-F5=screens  Ctrl+R=reload  Ctrl+L=login  Ctrl+O=logout  Ctrl+Q=quit");

    let mut spans = vec![Span::styled(base, dim_style())];
    if let Some(notice) = model.notice.as_deref().filter(|n| !n.trim().is_empty()) {
        spans.push(Span::styled("  ·  ".to_string(), dim_style()));
        spans.push(Span::styled(
            notice.to_string(),
            Style::default().fg(theme::ACCENT),
        ));
    }
    Paragraph::new(Line::from(spans))
}

fn titled_block(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BORDER))
        .padding(Padding::horizontal(1))
        .title(title.to_string())
}

fn focus_block(title: &str, focused: bool) -> Block<'static> {
    let block = titled_block(title);
    if focused {
        block.border_style(Style::default().fg(theme::ACCENT))
    } else {
        block
    }
}

fn muted_style() -> Style {
    Style::default().fg(theme::MUTED)
}

fn dim_style() -> Style {
    Style::default().fg(theme::DIM)
}

fn error_style() -> Style {
    Style::default().fg(theme::ERROR)
}

fn inner_area(area: Rect) -> Rect {
    if area.width < 40 || area.height < 12 {
        return area;
    }
    area.inner(Margin {
        vertical: 0,
        horizontal: 1,
    })
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{AppModel, SegmentsScreen};
    use crate::domain::{
        AudienceResult, Condition, DashboardSummary, DashboardUser, Field, Logic, RuleNode,
    };
    use ratatui::backend::TestBackend;

    fn draw(model: &AppModel) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).expect("terminal");
        terminal.draw(|frame| render(frame, model)).expect("draw");
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn customer(name: &str) -> Customer {
        Customer {
            id: name.to_lowercase(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            total_spend: 1200.0,
            visits: 7.0,
            last_purchase_date: None,
        }
    }

    #[test]
    fn segment_result_renders_audience_size_and_rows() {
        let mut screen = SegmentsScreen::new();
        screen.result = Some(AudienceResult {
            audience_size: 2,
            data: vec![customer("Asha"), customer("Ravi")],
        });
        let mut model = AppModel::new("http://crm.test");
        model.view = View::Segments(screen);

        let text = draw(&model);
        assert!(text.contains("Audience Size: 2"));
        assert!(text.contains("Asha"));
        assert!(text.contains("Ravi"));
        assert!(text.contains("asha@example.com"));
    }

    #[test]
    fn segment_screen_shows_json_preview() {
        let model = AppModel::new("http://crm.test");
        let mut model = model;
        model.view = View::Segments(SegmentsScreen::new());
        let text = draw(&model);
        assert!(text.contains("Generated JSON Rules"));
        assert!(text.contains("\"logic\": \"AND\""));
    }

    #[test]
    fn dashboard_shows_loading_then_welcome() {
        let mut model = AppModel::new("http://crm.test");
        model.view = View::Dashboard(DashboardScreen {
            loading: true,
            ..DashboardScreen::default()
        });
        assert!(draw(&model).contains("Loading dashboard..."));

        model.view = View::Dashboard(DashboardScreen {
            stats: Some(DashboardSummary {
                user: Some(DashboardUser {
                    name: "Meera".to_string(),
                }),
                total_customers: 3,
                ..DashboardSummary::default()
            }),
            loading: false,
            error: None,
        });
        let text = draw(&model);
        assert!(text.contains("Welcome back, Meera"));
        assert!(!text.contains("Revenue"));
    }

    #[test]
    fn rule_tree_marks_invalid_operator() {
        let rules = ConditionGroup {
            logic: Logic::Or,
            conditions: vec![
                RuleNode::Condition(Condition {
                    field: Field::LastPurchaseDate,
                    operator: ">".to_string(),
                    value: "30".to_string(),
                }),
                RuleNode::Group(ConditionGroup::default()),
            ],
        };
        let lines = rule_tree_lines(&rules, &RuleEditor::new(), false);
        let rendered: Vec<String> = lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect();
        assert_eq!(rendered[0], "[OR] group");
        assert!(rendered[1].contains("invalid operator"));
        assert!(rendered[2].contains("Remove Group"));
        assert_eq!(lines.len(), flatten(&rules).len());
    }

    #[test]
    fn rule_tree_scrolls_to_keep_the_cursor_visible() {
        let mut rules = ConditionGroup::default();
        for _ in 0..8 {
            rules.conditions.push(RuleNode::Group(ConditionGroup::default()));
        }
        rules.conditions.push(RuleNode::Condition(Condition {
            field: Field::Visits,
            operator: ">".to_string(),
            value: "ZZZ999".to_string(),
        }));
        let leaf_row = flatten(&rules)
            .iter()
            .position(|row| matches!(row, RuleRow::Condition { .. }))
            .expect("leaf row");

        let mut screen = SegmentsScreen::new();
        screen.rules = rules;
        screen.rule_editor.cursor = leaf_row;
        let mut model = AppModel::new("http://crm.test");
        model.view = View::Segments(screen);

        let text = draw(&model);
        assert!(text.contains("[ZZZ999]"), "{text}");
    }

    #[test]
    fn rule_tree_scroll_starts_at_top_until_cursor_passes_the_panel() {
        assert_eq!(rule_tree_scroll(0, 10), 0);
        assert_eq!(rule_tree_scroll(9, 10), 0);
        assert_eq!(rule_tree_scroll(10, 10), 1);
        assert_eq!(rule_tree_scroll(25, 16), 10);
    }

    #[test]
    fn campaign_list_shows_description_and_message() {
        let mut screen = CampaignsScreen::new();
        screen.campaigns = vec![Campaign {
            id: "k1".to_string(),
            name: "Diwali Sale".to_string(),
            description: "Festive\nbuyers".to_string(),
            message: "Hi {name}, 20% off".to_string(),
            ..Campaign::default()
        }];
        let mut model = AppModel::new("http://crm.test");
        model.view = View::Campaigns(screen);

        let text = draw(&model);
        assert!(text.contains("Diwali Sale"));
        assert!(text.contains("Festive buyers"));
        assert!(text.contains("Message: Hi {name}, 20% off"));
    }

    #[test]
    fn tab_bar_shows_sign_in_hint_when_signed_out() {
        let mut model = AppModel::new("http://crm.test");
        model.session.invalidate();
        let text = draw(&model);
        assert!(text.contains("MiniCRM"));
        assert!(text.contains("Ctrl+L to sign in"));
    }

    #[test]
    fn tab_bar_shows_signed_in_user() {
        let mut model = AppModel::new("http://crm.test");
        let generation = model.session.begin_probe();
        model.session.resolve(
            generation,
            Some(crate::domain::UserInfo {
                name: "Asha Rao".to_string(),
                email: None,
                avatar: None,
            }),
        );
        let text = draw(&model);
        assert!(text.contains("Asha Rao"));
        assert!(!text.contains("Checking session"));
    }
}
