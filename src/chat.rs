//! KropBot: canned answers picked by the first keyword found in the message.

const RESPONSES: &[(&str, &str)] = &[
    ("price", "Current market prices (per quintal):<br>• Rice: ₹2,200<br>• Wheat: ₹2,125<br>• Cotton: ₹6,080<br>Check the 'Live Market' section for more."),
    ("paddy", "Paddy (Rice) is currently trending at ₹2,200/quintal. Best time to sell is late November."),
    ("wheat", "Wheat prices are stable at ₹2,125. Demand is high in North India."),
    ("organic", "Organic certification can increase your produce value by 20-30%. We prioritize organic listings!"),
    ("buy", "<b>To Buy:</b><br>1. Go to Marketplace<br>2. Select products<br>3. Click 'Buy Now' to pay securely via Razorpay."),
    ("sell", "<b>To Sell:</b><br>1. Login as Farmer/Business<br>2. Go to Dashboard<br>3. Click 'List Product' or use the 'List Inventory' button."),
    ("quality", "Our AI Quality Score considers:<br>• Visual freshness (via image)<br>• Product description<br>• Standard grade specifications."),
    ("subsidy", "Govt subsidies available for:<br>• Drip Irrigation (50%)<br>• Solar Pumps (pm-KUSUM)<br>• Organic Fertilizer."),
    ("weather", "It looks sunny across major farming belts. Good for harvesting! (Real-time weather integration coming soon)."),
    ("pest", "For pests, we recommend organic neem oil spray initially. For severe infestations, consult an agronome."),
    ("hello", "Namaste! 🙏 I am KropBot. How can I help you with your farming journey today?"),
    ("hi", "Hello there! ready to help you with crops, prices, or navigating KropKart."),
    ("kropkart", "KropKart is an AI-powered marketplace connecting farmers directly to buyers, ensuring fair prices and fresh produce."),
    ("loan", "KropKart partners with banks to offer Kisan Credit Cards. Check the 'Finance' section in your dashboard."),
];

const CROP_WORDS: &[&str] = &["corn", "maize", "dal", "pulses", "gram"];
const ACCOUNT_WORDS: &[&str] = &["login", "signin", "account"];

const CROP_REPLY: &str =
    "We have listings for that crop! Please check the <a href='/citizen'>Marketplace</a> for live availability.";
const ACCOUNT_REPLY: &str =
    "You can <a href='/login'>Login here</a>. If you don't have an account, please <a href='/register'>Register</a>.";
const HELP_REPLY: &str = "I'm not sure about that specific query. Try asking about:<br>• Crop Prices (Rice, Wheat)<br>• Buying/Selling<br>• Organic Farming<br>• Government Schemes";

/// Plain substring matching, so short keys like `hi` also fire inside longer words.
pub fn reply(message: &str) -> &'static str {
    let message = message.to_lowercase();
    if let Some((_, answer)) = RESPONSES.iter().find(|(key, _)| message.contains(key)) {
        return *answer;
    }
    if CROP_WORDS.iter().any(|w| message.contains(w)) {
        CROP_REPLY
    } else if ACCOUNT_WORDS.iter().any(|w| message.contains(w)) {
        ACCOUNT_REPLY
    } else {
        HELP_REPLY
    }
}
