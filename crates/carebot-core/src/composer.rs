use carebot_schema::{Intent, Sentiment};

const FALLBACK_REPLY: &str = "I'm sorry you're dealing with this. I want to make sure you get the \
right help, could you tell me a little more about what's going on?";

const ESCALATION_NOTICE: &str = "It seems your query requires human assistance. I'm escalating \
this to a human agent now and providing them with our conversation history.";

type ReplyEntry = (Intent, Sentiment, &'static str);

#[rustfmt::skip]
const REPLIES: &[ReplyEntry] = &[
    (Intent::Greeting, Sentiment::Neutral, "Hello! How can I help you today?"),
    (Intent::Greeting, Sentiment::Positive, "Hi there, great to hear from you! What can I do for you today?"),
    (Intent::Greeting, Sentiment::Negative, "Hello. I'm sorry if something has gone wrong, tell me what happened and I'll do my best to help."),
    (Intent::Farewell, Sentiment::Neutral, "Thank you for contacting us. Have a great day!"),
    (Intent::Farewell, Sentiment::Positive, "Glad I could help! Have a wonderful day."),
    (Intent::Farewell, Sentiment::Negative, "I'm sorry we couldn't fully resolve things today. You can reach us any time and we'll pick up where we left off."),
    (Intent::PasswordReset, Sentiment::Neutral, "You can reset your password from the sign-in page using \"Forgot password\". A reset link will be sent to your registered email address."),
    (Intent::PasswordReset, Sentiment::Positive, "Sure! Use \"Forgot password\" on the sign-in page and we'll email you a reset link."),
    (Intent::PasswordReset, Sentiment::Negative, "I understand how frustrating it is to be locked out. Use \"Forgot password\" on the sign-in page and a reset link will be sent to your registered email right away."),
    (Intent::OrderStatus, Sentiment::Neutral, "I can help with that. Please share your order number and I'll check the latest tracking status."),
    (Intent::OrderStatus, Sentiment::Positive, "Happy to check on that for you! What's your order number?"),
    (Intent::OrderStatus, Sentiment::Negative, "I'm sorry your order is taking longer than expected. Please share your order number and I'll look into it straight away."),
    (Intent::ReturnsAndRefunds, Sentiment::Neutral, "Items can be returned within 30 days of delivery. Share your order number and I'll start the return or refund for you."),
    (Intent::ReturnsAndRefunds, Sentiment::Positive, "No problem! Share your order number and I'll get the return started."),
    (Intent::ReturnsAndRefunds, Sentiment::Negative, "I'm sorry the product didn't work out. Share your order number and I'll prioritise your return and refund."),
    (Intent::BillingQuery, Sentiment::Neutral, "I can help with billing questions. Could you tell me which invoice or charge you're asking about?"),
    (Intent::BillingQuery, Sentiment::Positive, "Happy to help with your billing question. Which invoice or charge is it about?"),
    (Intent::BillingQuery, Sentiment::Negative, "I'm sorry about the trouble with your bill. Please share the invoice number or the charge in question and I'll review it with you."),
    (Intent::TechnicalSupport, Sentiment::Neutral, "Let's get this working. Could you describe the problem and any error message you see? Restarting the device is often a good first step."),
    (Intent::TechnicalSupport, Sentiment::Positive, "Let's sort this out together. What exactly are you seeing, and have you tried restarting the device?"),
    (Intent::TechnicalSupport, Sentiment::Negative, "I'm sorry for the disruption. Please try restarting the device, and if the problem continues tell me the exact error so I can troubleshoot with you."),
    (Intent::ServiceIssue, Sentiment::Neutral, "Thanks for letting us know. Could you describe the issue in a bit more detail? If needed, I can help schedule a technician visit."),
    (Intent::ServiceIssue, Sentiment::Positive, "Thanks for reaching out. Tell me a bit more about the issue and I can book a technician if needed."),
    (Intent::ServiceIssue, Sentiment::Negative, "I'm really sorry about this. If there is any safety risk, please leave the area and contact emergency services. Otherwise, tell me more and I'll arrange a technician."),
    (Intent::ProductInquiry, Sentiment::Neutral, "Happy to help with product questions. Which product are you interested in?"),
    (Intent::ProductInquiry, Sentiment::Positive, "Glad you're interested! Which product would you like to know more about?"),
    (Intent::ProductInquiry, Sentiment::Negative, "I'm sorry for any confusion. Tell me which product you're asking about and I'll get you clear answers."),
    (Intent::EscalationRequest, Sentiment::Neutral, "Of course. I'm connecting you with a human agent now."),
    (Intent::EscalationRequest, Sentiment::Positive, "Of course! I'm connecting you with a human agent now."),
    (Intent::EscalationRequest, Sentiment::Negative, "I'm sorry I couldn't resolve this myself. I'm connecting you with a human agent now."),
];

/// Picks a canned reply for an (intent, sentiment) pair. Pure: the same
/// inputs always give the same text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseComposer;

impl ResponseComposer {
    pub fn new() -> Self {
        Self
    }

    pub fn compose_reply(&self, intent: Intent, sentiment: Sentiment) -> String {
        lookup(intent, sentiment).unwrap_or(FALLBACK_REPLY).to_string()
    }

    pub fn escalation_notice(&self) -> &'static str {
        ESCALATION_NOTICE
    }
}

fn lookup(intent: Intent, sentiment: Sentiment) -> Option<&'static str> {
    REPLIES
        .iter()
        .find(|(i, s, _)| *i == intent && *s == sentiment)
        .map(|(_, _, reply)| *reply)
}
